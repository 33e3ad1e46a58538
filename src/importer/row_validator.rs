// ==========================================
// 表格批量导入引擎 - 行校验器
// ==========================================
// 职责: 汇总一行所有字段的规则，对展开后的嵌套属性树统一校验
// 输出: 通过 → 属性树；失败 → 行号 + 第一条错误消息（并发出 danger 通知）
// 约束: 校验引擎内部错误直接向上抛出（导入整体失败），不做放行
// ==========================================

use crate::domain::attributes::{get_path, is_blank, undot, Attributes};
use crate::domain::field::FieldDescriptor;
use crate::i18n::{t, t_with_args};
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::field_pipeline::PreparedRow;
use crate::importer::notifier::{Notification, Notifier};
use crate::importer::rule::{display_attribute, Rule};
use serde_json::Value;
use tracing::debug;

static MISSING: Value = Value::Null;

/// 单行校验结果
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationOutcome {
    Passed(Attributes),
    Failed { line: usize, message: String },
}

pub struct RowValidator<'n> {
    notifier: &'n dyn Notifier,
}

impl<'n> RowValidator<'n> {
    pub fn new(notifier: &'n dyn Notifier) -> Self {
        Self { notifier }
    }

    /// 校验一行
    ///
    /// # 返回
    /// - Ok(Passed): 属性树（点路径已展开）
    /// - Ok(Failed): 第一条错误，已发送 danger 通知
    /// - Err(ValidatorInternal): 规则求值内部错误
    pub fn validate(&self, prepared: PreparedRow<'_>) -> ImportResult<ValidationOutcome> {
        let line = prepared.line;
        let tree = undot(prepared.values);

        for field in &prepared.fields {
            let value = get_path(&tree, field.id()).unwrap_or(&MISSING);
            if let Some(message) = Self::first_error(field, value)? {
                debug!(line = line, field = %field.id(), error = %message, "行校验失败");

                self.notifier.notify(Notification::danger(
                    t("import.import_failed_title"),
                    t_with_args(
                        "validators.message",
                        &[("line", &line.to_string()), ("error", &message)],
                    ),
                ));

                return Ok(ValidationOutcome::Failed { line, message });
            }
        }

        Ok(ValidationOutcome::Passed(tree))
    }

    /// 单字段第一条错误
    fn first_error(field: &FieldDescriptor, value: &Value) -> ImportResult<Option<String>> {
        let rules = field.validation_rules();
        let numeric = rules.iter().any(|rule| rule.is_numeric_marker());
        let nullable = rules.iter().any(|rule| matches!(rule, Rule::Nullable));
        let required = rules.iter().any(|rule| rule.is_implicit());

        // nullable 不覆盖 required
        if nullable && !required && value.is_null() {
            return Ok(None);
        }

        for rule in rules {
            // 非隐式规则对空值不生效
            if !rule.is_implicit() && is_blank(value) {
                continue;
            }

            let passed = rule
                .check(value, numeric)
                .map_err(|message| ImportError::ValidatorInternal {
                    field: field.id().to_string(),
                    message,
                })?;

            if !passed {
                return Ok(Some(Self::message_for(field, rule, value, numeric)));
            }
        }

        Ok(None)
    }

    fn message_for(field: &FieldDescriptor, rule: &Rule, value: &Value, numeric: bool) -> String {
        let attribute = display_attribute(field.id());
        match field.custom_messages().get(rule.name()) {
            Some(custom) => custom.replace(":attribute", &attribute),
            None => rule.default_message(&attribute, value, numeric),
        }
    }
}
