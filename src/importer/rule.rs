// ==========================================
// 表格批量导入引擎 - 校验规则
// ==========================================
// 职责: 解析 "name:param1,param2" 形式的规则表达式并对单个值求值
// 说明: 规则在字段描述构建时一次性解析，求值阶段不再出现语法错误
// ==========================================

use crate::domain::attributes::{is_blank, value_to_string};
use crate::i18n::t_with_args;
use crate::importer::error::{ImportError, ImportResult};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use regex::Regex;
use serde_json::Value;
use std::fmt;
use std::sync::{Arc, OnceLock};
use url::Url;

/// 自定义规则函数
///
/// - Ok(true): 通过
/// - Ok(false): 未通过（使用自定义消息或通用消息）
/// - Err(msg): 校验引擎内部错误（整个导入失败）
pub type CustomRuleFn = Arc<dyn Fn(&Value) -> Result<bool, String> + Send + Sync>;

/// 单条校验规则
#[derive(Clone)]
pub enum Rule {
    Required,
    Nullable,
    String,
    Numeric,
    Integer,
    Boolean,
    Email,
    Url,
    Date,
    Alpha,
    AlphaNum,
    AlphaDash,
    Min(f64),
    Max(f64),
    Size(f64),
    Between(f64, f64),
    Digits(usize),
    In(Vec<String>),
    NotIn(Vec<String>),
    Regex(Regex),
    Custom { name: String, check: CustomRuleFn },
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rule::Min(n) => write!(f, "min:{}", n),
            Rule::Max(n) => write!(f, "max:{}", n),
            Rule::Size(n) => write!(f, "size:{}", n),
            Rule::Between(a, b) => write!(f, "between:{},{}", a, b),
            Rule::Digits(n) => write!(f, "digits:{}", n),
            Rule::In(values) => write!(f, "in:{}", values.join(",")),
            Rule::NotIn(values) => write!(f, "not_in:{}", values.join(",")),
            Rule::Regex(re) => write!(f, "regex:{}", re.as_str()),
            other => write!(f, "{}", other.name()),
        }
    }
}

impl Rule {
    /// 解析单条规则表达式
    ///
    /// # 示例
    /// - "required"
    /// - "max:255"
    /// - "in:admin,editor"
    /// - "regex:/^[A-Z]{3}$/i"
    pub fn parse(expr: &str) -> ImportResult<Rule> {
        let expr = expr.trim();
        let (name, params) = match expr.split_once(':') {
            Some((name, params)) => (name.trim(), Some(params)),
            None => (expr, None),
        };

        let rule = match name {
            "required" => Rule::Required,
            "nullable" => Rule::Nullable,
            "string" => Rule::String,
            "numeric" => Rule::Numeric,
            "integer" => Rule::Integer,
            "boolean" => Rule::Boolean,
            "email" => Rule::Email,
            "url" => Rule::Url,
            "date" => Rule::Date,
            "alpha" => Rule::Alpha,
            "alpha_num" => Rule::AlphaNum,
            "alpha_dash" => Rule::AlphaDash,
            "min" => Rule::Min(number_param(expr, params)?),
            "max" => Rule::Max(number_param(expr, params)?),
            "size" => Rule::Size(number_param(expr, params)?),
            "between" => {
                let list = list_param(expr, params)?;
                if list.len() != 2 {
                    return Err(invalid(expr, "between 需要两个参数"));
                }
                let min = parse_number(expr, &list[0])?;
                let max = parse_number(expr, &list[1])?;
                Rule::Between(min, max)
            }
            "digits" => {
                let raw = params.ok_or_else(|| invalid(expr, "缺少参数"))?;
                let count = raw
                    .trim()
                    .parse::<usize>()
                    .map_err(|_| invalid(expr, "参数必须为非负整数"))?;
                Rule::Digits(count)
            }
            "in" => Rule::In(list_param(expr, params)?),
            "not_in" => Rule::NotIn(list_param(expr, params)?),
            "regex" => {
                let raw = params.ok_or_else(|| invalid(expr, "缺少正则表达式"))?;
                Rule::Regex(compile_pattern(expr, raw)?)
            }
            "" => return Err(invalid(expr, "规则名为空")),
            _ => return Err(invalid(expr, "未知规则")),
        };

        Ok(rule)
    }

    /// 解析 "|" 分隔的规则列表
    ///
    /// 注意: 含 "|" 的正则需通过 Rule::parse 单独添加
    pub fn parse_list(exprs: &str) -> ImportResult<Vec<Rule>> {
        exprs
            .split('|')
            .filter(|s| !s.trim().is_empty())
            .map(Rule::parse)
            .collect()
    }

    /// 创建自定义规则
    pub fn custom<F>(name: impl Into<String>, check: F) -> Rule
    where
        F: Fn(&Value) -> Result<bool, String> + Send + Sync + 'static,
    {
        Rule::Custom {
            name: name.into(),
            check: Arc::new(check),
        }
    }

    /// 规则名（自定义消息按此键查找）
    pub fn name(&self) -> &str {
        match self {
            Rule::Required => "required",
            Rule::Nullable => "nullable",
            Rule::String => "string",
            Rule::Numeric => "numeric",
            Rule::Integer => "integer",
            Rule::Boolean => "boolean",
            Rule::Email => "email",
            Rule::Url => "url",
            Rule::Date => "date",
            Rule::Alpha => "alpha",
            Rule::AlphaNum => "alpha_num",
            Rule::AlphaDash => "alpha_dash",
            Rule::Min(_) => "min",
            Rule::Max(_) => "max",
            Rule::Size(_) => "size",
            Rule::Between(_, _) => "between",
            Rule::Digits(_) => "digits",
            Rule::In(_) => "in",
            Rule::NotIn(_) => "not_in",
            Rule::Regex(_) => "regex",
            Rule::Custom { name, .. } => name,
        }
    }

    /// 空值时仍需执行的规则
    pub fn is_implicit(&self) -> bool {
        matches!(self, Rule::Required)
    }

    /// 是否让尺寸类规则按数值比较
    pub fn is_numeric_marker(&self) -> bool {
        matches!(self, Rule::Numeric | Rule::Integer)
    }

    /// 对单个值求值
    ///
    /// # 参数
    /// - value: 待校验值
    /// - numeric: 字段是否带 numeric/integer 规则
    pub(crate) fn check(&self, value: &Value, numeric: bool) -> Result<bool, String> {
        let passed = match self {
            Rule::Required => !is_blank(value),
            Rule::Nullable => true,
            Rule::String => value.is_string(),
            Rule::Numeric => as_number(value).is_some(),
            Rule::Integer => is_integer(value),
            Rule::Boolean => is_boolean(value),
            Rule::Email => scalar_text(value).map_or(false, |s| email_regex().is_match(&s)),
            Rule::Url => scalar_text(value).map_or(false, |s| is_url(&s)),
            Rule::Date => scalar_text(value).map_or(false, |s| parse_date(&s)),
            Rule::Alpha => scalar_text(value).map_or(false, |s| s.chars().all(char::is_alphabetic)),
            Rule::AlphaNum => {
                scalar_text(value).map_or(false, |s| s.chars().all(char::is_alphanumeric))
            }
            Rule::AlphaDash => scalar_text(value).map_or(false, |s| {
                s.chars().all(|c| c.is_alphanumeric() || c == '-' || c == '_')
            }),
            Rule::Min(min) => size_of(value, numeric).map_or(false, |size| size >= *min),
            Rule::Max(max) => size_of(value, numeric).map_or(false, |size| size <= *max),
            Rule::Size(expected) => {
                size_of(value, numeric).map_or(false, |size| (size - expected).abs() < f64::EPSILON)
            }
            Rule::Between(min, max) => {
                size_of(value, numeric).map_or(false, |size| size >= *min && size <= *max)
            }
            Rule::Digits(count) => scalar_text(value).map_or(false, |s| {
                s.chars().count() == *count && s.chars().all(|c| c.is_ascii_digit())
            }),
            Rule::In(allowed) => scalar_text(value).map_or(false, |s| allowed.contains(&s)),
            Rule::NotIn(denied) => scalar_text(value).map_or(true, |s| !denied.contains(&s)),
            Rule::Regex(re) => scalar_text(value).map_or(false, |s| re.is_match(&s)),
            Rule::Custom { check, .. } => return check(value),
        };

        Ok(passed)
    }

    /// 默认错误消息（经 i18n 翻译）
    pub(crate) fn default_message(&self, attribute: &str, value: &Value, numeric: bool) -> String {
        let kind = size_kind(value, numeric);
        match self {
            Rule::Min(min) => t_with_args(
                &format!("validation.min.{}", kind),
                &[("attribute", attribute), ("min", &format_number(*min))],
            ),
            Rule::Max(max) => t_with_args(
                &format!("validation.max.{}", kind),
                &[("attribute", attribute), ("max", &format_number(*max))],
            ),
            Rule::Size(size) => t_with_args(
                &format!("validation.size.{}", kind),
                &[("attribute", attribute), ("size", &format_number(*size))],
            ),
            Rule::Between(min, max) => t_with_args(
                &format!("validation.between.{}", kind),
                &[
                    ("attribute", attribute),
                    ("min", &format_number(*min)),
                    ("max", &format_number(*max)),
                ],
            ),
            Rule::Digits(count) => t_with_args(
                "validation.digits",
                &[("attribute", attribute), ("digits", &count.to_string())],
            ),
            Rule::Custom { .. } => t_with_args("validation.custom", &[("attribute", attribute)]),
            other => t_with_args(
                &format!("validation.{}", other.name()),
                &[("attribute", attribute)],
            ),
        }
    }
}

/// 字段 id 转展示名（下划线转空格）
pub fn display_attribute(id: &str) -> String {
    id.replace('_', " ")
}

// ==========================================
// 解析辅助
// ==========================================

fn invalid(rule: &str, message: &str) -> ImportError {
    ImportError::InvalidRule {
        rule: rule.to_string(),
        message: message.to_string(),
    }
}

fn number_param(expr: &str, params: Option<&str>) -> ImportResult<f64> {
    let raw = params.ok_or_else(|| invalid(expr, "缺少参数"))?;
    parse_number(expr, raw)
}

fn parse_number(expr: &str, raw: &str) -> ImportResult<f64> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|n| n.is_finite())
        .ok_or_else(|| invalid(expr, "参数必须为数字"))
}

fn list_param(expr: &str, params: Option<&str>) -> ImportResult<Vec<String>> {
    let raw = params.ok_or_else(|| invalid(expr, "缺少参数"))?;
    Ok(raw.split(',').map(|s| s.trim().to_string()).collect())
}

/// 编译正则，支持 "/pattern/flags" 定界写法
fn compile_pattern(expr: &str, raw: &str) -> ImportResult<Regex> {
    let raw = raw.trim();
    let pattern = match (raw.starts_with('/'), raw.rfind('/')) {
        (true, Some(end)) if end > 0 => {
            let body = &raw[1..end];
            let flags = &raw[end + 1..];
            if flags.contains('i') {
                format!("(?i){}", body)
            } else {
                body.to_string()
            }
        }
        _ => raw.to_string(),
    };

    Regex::new(&pattern).map_err(|e| invalid(expr, &e.to_string()))
}

// ==========================================
// 求值辅助
// ==========================================

fn email_regex() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| {
        Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("内置邮箱正则无效")
    })
}

/// 仅接受带主机名的 http/https 地址
fn is_url(text: &str) -> bool {
    match Url::parse(text.trim()) {
        Ok(url) => matches!(url.scheme(), "http" | "https") && url.host_str().is_some(),
        Err(_) => false,
    }
}

/// 标量值转文本（数组/对象/Null 返回 None）
fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(_) | Value::Number(_) | Value::Bool(_) => Some(value_to_string(value)),
        _ => None,
    }
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
        _ => None,
    }
}

fn is_integer(value: &Value) -> bool {
    match value {
        Value::Number(n) => {
            n.is_i64() || n.is_u64() || n.as_f64().map_or(false, |f| f.fract() == 0.0)
        }
        Value::String(s) => s.trim().parse::<i64>().is_ok(),
        _ => false,
    }
}

fn is_boolean(value: &Value) -> bool {
    match value {
        Value::Bool(_) => true,
        Value::Number(n) => n.as_f64().map_or(false, |f| f == 0.0 || f == 1.0),
        Value::String(s) => matches!(s.trim(), "0" | "1"),
        _ => false,
    }
}

fn parse_date(text: &str) -> bool {
    let text = text.trim();
    if DateTime::parse_from_rfc3339(text).is_ok() {
        return true;
    }

    const DATE_FORMATS: [&str; 4] = ["%Y-%m-%d", "%Y/%m/%d", "%d.%m.%Y", "%Y%m%d"];
    const DATETIME_FORMATS: [&str; 3] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y/%m/%d %H:%M:%S"];

    DATE_FORMATS
        .iter()
        .any(|fmt| NaiveDate::parse_from_str(text, fmt).is_ok())
        || DATETIME_FORMATS
            .iter()
            .any(|fmt| NaiveDateTime::parse_from_str(text, fmt).is_ok())
}

/// 尺寸类规则的比较量
fn size_of(value: &Value, numeric: bool) -> Option<f64> {
    if numeric {
        if let Some(n) = as_number(value) {
            return Some(n);
        }
    }

    match value {
        Value::Array(items) => Some(items.len() as f64),
        Value::Object(map) => Some(map.len() as f64),
        Value::Null => None,
        other => Some(value_to_string(other).chars().count() as f64),
    }
}

fn size_kind(value: &Value, numeric: bool) -> &'static str {
    if numeric && as_number(value).is_some() {
        "numeric"
    } else if value.is_array() || value.is_object() {
        "array"
    } else {
        "string"
    }
}

fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_list() {
        let rules = Rule::parse_list("required|email|max:255").unwrap();
        let names: Vec<&str> = rules.iter().map(|r| r.name()).collect();
        assert_eq!(names, vec!["required", "email", "max"]);
    }

    #[test]
    fn test_parse_rejects_unknown_and_malformed() {
        assert!(matches!(
            Rule::parse("shiny"),
            Err(ImportError::InvalidRule { .. })
        ));
        assert!(Rule::parse("max:abc").is_err());
        assert!(Rule::parse("between:1").is_err());
        assert!(Rule::parse("regex:/[a-/").is_err());
        assert!(Rule::parse("in").is_err());
    }

    #[test]
    fn test_size_rules_switch_on_numeric_marker() {
        let max = Rule::parse("max:10").unwrap();
        // 字符串按长度比较
        assert!(max.check(&json!("12345"), false).unwrap());
        // 数值规则下按数值比较
        assert!(!max.check(&json!("12345"), true).unwrap());
        assert!(max.check(&json!("9.5"), true).unwrap());
    }

    #[test]
    fn test_between_and_size() {
        let between = Rule::parse("between:2,4").unwrap();
        assert!(between.check(&json!("abc"), false).unwrap());
        assert!(!between.check(&json!("abcde"), false).unwrap());
        assert!(between.check(&json!([1, 2]), false).unwrap());

        let size = Rule::parse("size:3").unwrap();
        assert!(size.check(&json!(3), true).unwrap());
        assert!(!size.check(&json!(3), false).unwrap());
    }

    #[test]
    fn test_type_rules() {
        assert!(Rule::Integer.check(&json!("42"), false).unwrap());
        assert!(Rule::Integer.check(&json!(42.0), false).unwrap());
        assert!(!Rule::Integer.check(&json!("4.2"), false).unwrap());
        assert!(Rule::Numeric.check(&json!(" 4.2 "), false).unwrap());
        assert!(!Rule::Numeric.check(&json!("NaN"), false).unwrap());
        assert!(Rule::Boolean.check(&json!("1"), false).unwrap());
        assert!(!Rule::Boolean.check(&json!("yes"), false).unwrap());
        assert!(Rule::String.check(&json!("x"), false).unwrap());
        assert!(!Rule::String.check(&json!(1), false).unwrap());
    }

    #[test]
    fn test_format_rules() {
        assert!(Rule::Email.check(&json!("a@example.com"), false).unwrap());
        assert!(!Rule::Email.check(&json!("not-an-email"), false).unwrap());
        assert!(Rule::Url.check(&json!("https://example.com/a"), false).unwrap());
        assert!(!Rule::Url.check(&json!("example.com"), false).unwrap());
        assert!(!Rule::Url.check(&json!("ftp://example.com"), false).unwrap());
        assert!(!Rule::Url.check(&json!("https://exa mple.com"), false).unwrap());
        assert!(Rule::Date.check(&json!("2026-01-31"), false).unwrap());
        assert!(Rule::Date.check(&json!("2026-01-31T08:00:00Z"), false).unwrap());
        assert!(!Rule::Date.check(&json!("2026-02-31"), false).unwrap());
        assert!(Rule::AlphaDash.check(&json!("ab-c_1"), false).unwrap());
        assert!(!Rule::Alpha.check(&json!("ab1"), false).unwrap());
        assert!(Rule::parse("digits:4").unwrap().check(&json!("0123"), false).unwrap());
        assert!(!Rule::parse("digits:4").unwrap().check(&json!("123"), false).unwrap());
    }

    #[test]
    fn test_in_not_in_and_regex() {
        let role = Rule::parse("in:admin,editor").unwrap();
        assert!(role.check(&json!("editor"), false).unwrap());
        assert!(!role.check(&json!("guest"), false).unwrap());

        let not_in = Rule::parse("not_in:root").unwrap();
        assert!(!not_in.check(&json!("root"), false).unwrap());

        let code = Rule::parse("regex:/^[a-z]{3}$/i").unwrap();
        assert!(code.check(&json!("ABC"), false).unwrap());
        assert!(!code.check(&json!("ABCD"), false).unwrap());
    }

    #[test]
    fn test_custom_rule_internal_error() {
        let rule = Rule::custom("even", |v| match v.as_i64() {
            Some(n) => Ok(n % 2 == 0),
            None => Err("期望整数".to_string()),
        });
        assert_eq!(rule.name(), "even");
        assert!(rule.check(&json!(4), false).unwrap());
        assert!(!rule.check(&json!(3), false).unwrap());
        assert!(rule.check(&json!("x"), false).is_err());
    }

    #[test]
    fn test_default_message_english() {
        let _guard = crate::i18n::locale_guard("en");
        let msg = Rule::Required.default_message("first name", &Value::Null, false);
        assert_eq!(msg, "The first name field is required.");

        let msg = Rule::Max(3.0).default_message("code", &json!("abcd"), false);
        assert_eq!(msg, "The code field must not be greater than 3 characters.");
    }

    #[test]
    fn test_display_attribute() {
        assert_eq!(display_attribute("first_name"), "first name");
        assert_eq!(display_attribute("profile.email"), "profile.email");
    }
}
