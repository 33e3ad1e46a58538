// ==========================================
// 表格批量导入引擎 - 重复检测
// ==========================================
// 职责: 按唯一字段判断一行是否已存在于目标记录类型
// 规则:
// - 唯一字段值缺失/为 null → MissingValue（调用方中止整个导入）
// - 已存在同值记录 → Duplicate（该行跳过，计入 skipped）
// - 否则 → Fresh
// ==========================================

use crate::domain::attributes::{get_path, Attributes};
use crate::domain::record::Record;
use crate::repository::error::RepositoryResult;
use crate::repository::record_store::RecordTransaction;
use serde_json::Value;

#[derive(Debug, Clone, PartialEq)]
pub enum UniqueCheck {
    Fresh,
    Duplicate(Record),
    MissingValue,
}

pub struct DuplicationGuard<'a> {
    model: &'a str,
    unique_field: &'a str,
}

impl<'a> DuplicationGuard<'a> {
    pub fn new(model: &'a str, unique_field: &'a str) -> Self {
        Self {
            model,
            unique_field,
        }
    }

    pub fn unique_field(&self) -> &str {
        self.unique_field
    }

    /// 在当前事务内检查（可见本次导入已创建的记录）
    pub fn check(
        &self,
        tx: &mut dyn RecordTransaction,
        attributes: &Attributes,
    ) -> RepositoryResult<UniqueCheck> {
        let value = match get_path(attributes, self.unique_field) {
            None | Some(Value::Null) => return Ok(UniqueCheck::MissingValue),
            Some(value) => value,
        };

        Ok(match tx.find_where(self.model, self.unique_field, value)? {
            Some(existing) => UniqueCheck::Duplicate(existing),
            None => UniqueCheck::Fresh,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::memory_record_store::MemoryRecordStore;
    use crate::repository::record_store::{RecordStore, TransactionOutcome};
    use serde_json::json;

    fn attrs(value: Value) -> Attributes {
        value.as_object().cloned().unwrap()
    }

    fn check(store: &mut MemoryRecordStore, field: &str, row: Value) -> UniqueCheck {
        let guard = DuplicationGuard::new("users", field);
        let result: RepositoryResult<UniqueCheck> =
            store.transaction(|tx| Ok(TransactionOutcome::Rollback(guard.check(tx, &attrs(row))?)));
        result.unwrap()
    }

    #[test]
    fn test_existing_value_is_duplicate() {
        let mut store = MemoryRecordStore::new();
        let existing = store.seed("users", attrs(json!({"email": "a@x.io"})));

        assert_eq!(
            check(&mut store, "email", json!({"email": "a@x.io"})),
            UniqueCheck::Duplicate(existing)
        );
        assert_eq!(
            check(&mut store, "email", json!({"email": "b@x.io"})),
            UniqueCheck::Fresh
        );
    }

    #[test]
    fn test_missing_or_null_value() {
        let mut store = MemoryRecordStore::new();
        assert_eq!(
            check(&mut store, "email", json!({"name": "A"})),
            UniqueCheck::MissingValue
        );
        assert_eq!(
            check(&mut store, "email", json!({"email": null})),
            UniqueCheck::MissingValue
        );
    }

    #[test]
    fn test_nested_unique_field() {
        let mut store = MemoryRecordStore::new();
        store.seed("users", attrs(json!({"profile": {"code": "U1"}})));
        assert!(matches!(
            check(&mut store, "profile.code", json!({"profile": {"code": "U1"}})),
            UniqueCheck::Duplicate(_)
        ));
    }
}
