// ==========================================
// 表格批量导入引擎 - 内存记录仓储
// ==========================================
// 职责: 无数据库的确定性实现（测试/预演）
// 事务: 开启时复制快照，提交时整体替换，回滚时丢弃
// ==========================================

use crate::domain::attributes::Attributes;
use crate::domain::record::Record;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::record_store::{RecordStore, RecordTransaction, TransactionOutcome};
use serde_json::Value;
use std::collections::HashMap;

#[derive(Debug, Clone, Default)]
pub struct MemoryRecordStore {
    tables: HashMap<String, Vec<Record>>,
    next_id: i64,
    commits: usize,
    rollbacks: usize,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 直接写入一条已提交记录（准备测试数据）
    pub fn seed(&mut self, model: &str, attributes: Attributes) -> Record {
        self.next_id += 1;
        let record = Record {
            model: model.to_string(),
            id: Some(self.next_id),
            attributes,
        };
        self.tables
            .entry(model.to_string())
            .or_default()
            .push(record.clone());
        record
    }

    /// 某类型的全部已提交记录
    pub fn all(&self, model: &str) -> Vec<Record> {
        self.tables.get(model).cloned().unwrap_or_default()
    }

    pub fn count(&self, model: &str) -> usize {
        self.tables.get(model).map_or(0, Vec::len)
    }

    pub fn commit_count(&self) -> usize {
        self.commits
    }

    pub fn rollback_count(&self) -> usize {
        self.rollbacks
    }
}

struct MemoryTransaction {
    tables: HashMap<String, Vec<Record>>,
    next_id: i64,
}

impl RecordTransaction for MemoryTransaction {
    fn create(&mut self, model: &str, attributes: &Attributes) -> RepositoryResult<Record> {
        let mut record = Record::new(model);
        record.fill(attributes);
        self.save(&mut record)?;
        Ok(record)
    }

    fn save(&mut self, record: &mut Record) -> RepositoryResult<()> {
        if record.model.is_empty() {
            return Err(RepositoryError::InternalError("记录类型为空".to_string()));
        }

        self.next_id += 1;
        record.id = Some(self.next_id);
        self.tables
            .entry(record.model.clone())
            .or_default()
            .push(record.clone());
        Ok(())
    }

    fn find_where(
        &mut self,
        model: &str,
        field: &str,
        value: &Value,
    ) -> RepositoryResult<Option<Record>> {
        Ok(self.tables.get(model).and_then(|records| {
            records
                .iter()
                .find(|record| record.get(field) == Some(value))
                .cloned()
        }))
    }
}

impl RecordStore for MemoryRecordStore {
    fn transaction<T, E, F>(&mut self, body: F) -> Result<T, E>
    where
        F: FnOnce(&mut dyn RecordTransaction) -> Result<TransactionOutcome<T>, E>,
        E: From<RepositoryError>,
    {
        let mut tx = MemoryTransaction {
            tables: self.tables.clone(),
            next_id: self.next_id,
        };

        match body(&mut tx) {
            Ok(TransactionOutcome::Commit(value)) => {
                self.tables = tx.tables;
                self.next_id = tx.next_id;
                self.commits += 1;
                Ok(value)
            }
            Ok(TransactionOutcome::Rollback(value)) => {
                self.rollbacks += 1;
                Ok(value)
            }
            Err(err) => {
                self.rollbacks += 1;
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn attrs(value: Value) -> Attributes {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_commit_publishes_changes() {
        let mut store = MemoryRecordStore::new();
        let created: RepositoryResult<Record> = store.transaction(|tx| {
            let record = tx.create("users", &attrs(json!({"email": "a@x.io"})))?;
            Ok(TransactionOutcome::Commit(record))
        });

        assert_eq!(created.unwrap().id, Some(1));
        assert_eq!(store.count("users"), 1);
        assert_eq!(store.commit_count(), 1);
    }

    #[test]
    fn test_rollback_discards_changes_but_reads_own_writes() {
        let mut store = MemoryRecordStore::new();
        let seen: RepositoryResult<bool> = store.transaction(|tx| {
            tx.fill_and_save("users", &attrs(json!({"email": "a@x.io"})))?;
            let found = tx.find_where("users", "email", &json!("a@x.io"))?;
            Ok(TransactionOutcome::Rollback(found.is_some()))
        });

        assert!(seen.unwrap());
        assert_eq!(store.count("users"), 0);
        assert_eq!(store.rollback_count(), 1);
    }

    #[test]
    fn test_error_rolls_back() {
        let mut store = MemoryRecordStore::new();
        let result: RepositoryResult<()> = store.transaction(|tx| {
            tx.create("users", &attrs(json!({"email": "a@x.io"})))?;
            Err(RepositoryError::InternalError("boom".to_string()))
        });

        assert!(result.is_err());
        assert_eq!(store.count("users"), 0);
    }

    #[test]
    fn test_find_where_nested_path() {
        let mut store = MemoryRecordStore::new();
        store.seed("users", attrs(json!({"profile": {"email": "a@x.io"}})));

        let found: RepositoryResult<Option<Record>> = store.transaction(|tx| {
            Ok(TransactionOutcome::Commit(tx.find_where(
                "users",
                "profile.email",
                &json!("a@x.io"),
            )?))
        });
        assert_eq!(found.unwrap().and_then(|r| r.id), Some(1));
    }
}
