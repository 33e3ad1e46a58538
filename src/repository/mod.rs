// ==========================================
// 表格批量导入引擎 - 数据仓储层
// ==========================================
// 红线: Repository 不含业务逻辑
// ==========================================
// 职责: 提供事务化的记录访问接口,屏蔽数据库细节
// 约束: 所有值参数化；标识符校验后拼接
// ==========================================

pub mod error;
pub mod memory_record_store;
pub mod record_store;
pub mod sqlite_record_store;

// 重导出核心仓储
pub use error::{RepositoryError, RepositoryResult};
pub use memory_record_store::MemoryRecordStore;
pub use record_store::{validate_identifier, RecordStore, RecordTransaction, TransactionOutcome};
pub use sqlite_record_store::SqliteRecordStore;
