// ==========================================
// 表格批量导入引擎 - 导入层
// ==========================================
// 职责: 表格文件 → 字段管道 → 行校验 → 去重 → 事务化创建记录
// 支持: CSV, Excel (xlsx/xlsm/xls), ODS
// ==========================================

// 模块声明
pub mod disk;
pub mod duplication_guard;
pub mod error;
pub mod field_pipeline;
pub mod file_parser;
pub mod import_builder;
pub mod import_executor;
pub mod notifier;
pub mod row_source;
pub mod row_validator;
pub mod rule;

// 重导出核心类型
pub use disk::{Disk, DiskRegistry, LocalDisk, MemoryDisk};
pub use duplication_guard::{DuplicationGuard, UniqueCheck};
pub use error::{ImportError, ImportResult};
pub use field_pipeline::{FieldOutcome, FieldPipeline, PreparedRow};
pub use file_parser::{CsvParser, ExcelParser, FileParser, UniversalFileParser};
pub use import_builder::{
    AfterCreateHook, BeforeCreateHook, CompletionCallback, CreationOverride, FieldMapping,
    ImportBuilder, ImportConfig,
};
pub use import_executor::{ExecutionResult, ImportExecutor};
pub use notifier::{MemoryNotifier, Notification, NotificationKind, Notifier, TracingNotifier};
pub use row_source::RowSource;
pub use row_validator::{RowValidator, ValidationOutcome};
pub use rule::Rule;
