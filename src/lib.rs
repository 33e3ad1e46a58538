// ==========================================
// 表格批量导入引擎 - 核心库
// ==========================================
// 职责: CSV/Excel 表格 → 字段映射 → 逐行校验 → 去重 → 单事务批量创建记录
// 技术栈: Rust + SQLite (rusqlite) + calamine/csv
// ==========================================

// 初始化国际化系统
rust_i18n::i18n!("locales", fallback = "en");

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 行数据/属性/字段描述/记录
pub mod domain;

// 数据仓储层 - 事务化记录访问
pub mod repository;

// 导入层 - 解码、校验、执行
pub mod importer;

// 配置层 - 导入默认值
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一）
pub mod db;

// 日志系统
pub mod logging;

// 国际化
pub mod i18n;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::{Attributes, FieldDescriptor, Record, SheetRow};

// 导入
pub use importer::{
    DiskRegistry, ExecutionResult, FieldMapping, ImportBuilder, ImportConfig, ImportError,
    ImportExecutor, ImportResult, Notification, NotificationKind, Notifier, Rule,
};

// 仓储
pub use repository::{
    MemoryRecordStore, RecordStore, RecordTransaction, RepositoryError, SqliteRecordStore,
};

// 配置
pub use config::{ConfigManager, ImportConfigReader, ImportDefaults};

// ==========================================
// 常量定义
// ==========================================

// 版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
