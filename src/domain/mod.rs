// ==========================================
// 表格批量导入引擎 - 领域模型层
// ==========================================
// 职责: 行数据、属性树、字段描述、记录
// 红线: 不含数据访问逻辑
// ==========================================

pub mod attributes;
pub mod field;
pub mod record;
pub mod row;

// 重导出核心类型
pub use attributes::Attributes;
pub use field::{FieldDescriptor, FieldMutator};
pub use record::Record;
pub use row::SheetRow;
