// ==========================================
// 表格批量导入引擎 - 字段描述
// ==========================================
// 职责: 每个映射列一份，声明是否必填、校验规则、自定义消息、创建前变换
// 约束: 导入配置完成后不可变
// ==========================================

use crate::domain::row::SheetRow;
use crate::importer::error::ImportResult;
use crate::importer::rule::Rule;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

static IMPLICIT_REQUIRED: Rule = Rule::Required;

/// 字段级创建前变换
///
/// # 参数
/// - 原始单元格值
/// - 整行数据
///
/// # 返回
/// - Some(value): 变换结果
/// - None / Null / 空串: 不做变换，沿用原始值
pub type FieldMutator = Arc<dyn Fn(&Value, &SheetRow) -> Option<Value> + Send + Sync>;

/// 字段描述
#[derive(Clone)]
pub struct FieldDescriptor {
    id: String,
    required: bool,
    rules: Vec<Rule>,
    messages: HashMap<String, String>,
    mutator: Option<FieldMutator>,
}

impl fmt::Debug for FieldDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldDescriptor")
            .field("id", &self.id)
            .field("required", &self.required)
            .field("rules", &self.rules)
            .field("messages", &self.messages)
            .field("mutator", &self.mutator.is_some())
            .finish()
    }
}

impl FieldDescriptor {
    /// 创建字段描述
    ///
    /// # 参数
    /// - id: 点路径键（如 "profile.email"）
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            required: false,
            rules: Vec::new(),
            messages: HashMap::new(),
            mutator: None,
        }
    }

    /// 设置是否必填
    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    /// 追加 "|" 分隔的规则表达式
    pub fn rules(mut self, exprs: &str) -> ImportResult<Self> {
        self.rules.extend(Rule::parse_list(exprs)?);
        Ok(self)
    }

    /// 追加单条规则
    pub fn rule(mut self, rule: Rule) -> Self {
        self.rules.push(rule);
        self
    }

    /// 设置某条规则的自定义错误消息（支持 :attribute 占位符）
    pub fn message(mut self, rule: impl Into<String>, message: impl Into<String>) -> Self {
        self.messages.insert(rule.into(), message.into());
        self
    }

    /// 设置创建前变换
    pub fn mutate_before_create<F>(mut self, mutator: F) -> Self
    where
        F: Fn(&Value, &SheetRow) -> Option<Value> + Send + Sync + 'static,
    {
        self.mutator = Some(Arc::new(mutator));
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    /// 生效的校验规则（必填字段隐式带 required）
    pub fn validation_rules(&self) -> Vec<&Rule> {
        let mut rules: Vec<&Rule> = Vec::with_capacity(self.rules.len() + 1);
        if self.required && !self.rules.iter().any(|r| matches!(r, Rule::Required)) {
            rules.push(&IMPLICIT_REQUIRED);
        }
        rules.extend(self.rules.iter());
        rules
    }

    pub fn custom_messages(&self) -> &HashMap<String, String> {
        &self.messages
    }

    pub fn mutator(&self) -> Option<&FieldMutator> {
        self.mutator.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_field_gets_implicit_rule() {
        let field = FieldDescriptor::new("name")
            .required(true)
            .rules("string|max:50")
            .unwrap();
        let names: Vec<&str> = field.validation_rules().iter().map(|r| r.name()).collect();
        assert_eq!(names, vec!["required", "string", "max"]);
    }

    #[test]
    fn test_required_rule_not_duplicated() {
        let field = FieldDescriptor::new("name")
            .required(true)
            .rules("required|string")
            .unwrap();
        assert_eq!(field.validation_rules().len(), 2);
    }

    #[test]
    fn test_invalid_rule_is_rejected_at_build_time() {
        assert!(FieldDescriptor::new("age").rules("integer|min:x").is_err());
    }
}
