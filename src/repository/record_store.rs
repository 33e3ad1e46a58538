// ==========================================
// 表格批量导入引擎 - 记录仓储 Trait
// ==========================================
// 职责: 定义导入引擎所需的事务化数据访问接口（不包含实现）
// 红线: Repository 不含业务规则，只做数据 CRUD
// ==========================================

use crate::domain::attributes::Attributes;
use crate::domain::record::Record;
use crate::repository::error::{RepositoryError, RepositoryResult};
use serde_json::Value;

/// 事务体的结束方式
#[derive(Debug, Clone, PartialEq)]
pub enum TransactionOutcome<T> {
    /// 提交事务
    Commit(T),
    /// 回滚事务（非错误，业务决定放弃）
    Rollback(T),
}

// ==========================================
// RecordTransaction Trait
// ==========================================
// 用途: 一次事务内的读写操作
// 实现者: SqliteTransaction, MemoryTransaction
pub trait RecordTransaction {
    /// 一步创建并持久化
    fn create(&mut self, model: &str, attributes: &Attributes) -> RepositoryResult<Record>;

    /// 持久化一条已填充的记录（写回 id）
    fn save(&mut self, record: &mut Record) -> RepositoryResult<()>;

    /// 按字段（支持点路径）精确查找第一条记录
    fn find_where(
        &mut self,
        model: &str,
        field: &str,
        value: &Value,
    ) -> RepositoryResult<Option<Record>>;

    /// 实例化一条空记录
    fn instantiate(&self, model: &str) -> Record {
        Record::new(model)
    }

    /// 实例化 → 填充 → 显式保存
    fn fill_and_save(&mut self, model: &str, attributes: &Attributes) -> RepositoryResult<Record> {
        let mut record = self.instantiate(model);
        record.fill(attributes);
        self.save(&mut record)?;
        Ok(record)
    }
}

// ==========================================
// RecordStore Trait
// ==========================================
// 用途: 开启事务
// 实现者: SqliteRecordStore, MemoryRecordStore
pub trait RecordStore {
    /// 在单个事务中执行 body
    ///
    /// # 语义
    /// - body 返回 Ok(Commit) → 提交
    /// - body 返回 Ok(Rollback) → 回滚
    /// - body 返回 Err → 回滚并透传错误
    fn transaction<T, E, F>(&mut self, body: F) -> Result<T, E>
    where
        F: FnOnce(&mut dyn RecordTransaction) -> Result<TransactionOutcome<T>, E>,
        E: From<RepositoryError>;
}

/// 校验 SQL 标识符（表名/列名）
pub fn validate_identifier(name: &str) -> RepositoryResult<&str> {
    let mut chars = name.chars();
    let valid_head = chars
        .next()
        .map_or(false, |c| c.is_ascii_alphabetic() || c == '_');
    let valid_tail = chars.all(|c| c.is_ascii_alphanumeric() || c == '_');

    if valid_head && valid_tail {
        Ok(name)
    } else {
        Err(RepositoryError::InvalidIdentifier(name.to_string()))
    }
}
