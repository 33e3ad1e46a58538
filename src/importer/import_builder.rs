// ==========================================
// 表格批量导入引擎 - 导入配置构建器
// ==========================================
// 职责: 以链式调用收集导入配置，build() 后得到不可变的 ImportConfig
// 约束: make() 必须最先调用，execute() 最后调用；其余调用顺序无关
// ==========================================

use crate::config::ImportDefaults;
use crate::domain::attributes::{dot, Attributes};
use crate::domain::field::FieldDescriptor;
use crate::domain::record::Record;
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::import_executor::{ExecutionResult, ImportExecutor};
use crate::importer::notifier::Notifier;
use crate::repository::record_store::{validate_identifier, RecordStore, RecordTransaction};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

// ==========================================
// 回调类型
// ==========================================

/// 校验通过后、去重前的整行变换
pub type BeforeCreateHook = Arc<dyn Fn(Attributes) -> Attributes + Send + Sync>;

/// 记录创建后的副作用钩子（在同一事务内）
pub type AfterCreateHook =
    Arc<dyn Fn(&mut dyn RecordTransaction, &Record, &Attributes) -> ImportResult<()> + Send + Sync>;

/// 替代默认创建逻辑（在同一事务内）
pub type CreationOverride =
    Arc<dyn Fn(&mut dyn RecordTransaction, &Attributes) -> ImportResult<Record> + Send + Sync>;

/// 导入结束回调
pub type CompletionCallback = Box<dyn FnOnce(&ExecutionResult) + Send>;

// ==========================================
// FieldMapping - 字段 → 列号 / 常量
// ==========================================
// 列字段: 逐行取单元格，经字段管道与校验
// 常量字段: 每行写入同一值，不取列、不变换、不校验
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldMapping {
    entries: Vec<(String, usize)>,
    constants: Vec<(String, Value)>,
}

impl FieldMapping {
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加一个映射（同名字段覆盖原列号，位置不变）
    pub fn map(mut self, id: impl Into<String>, column: usize) -> Self {
        self.insert(id.into(), column);
        self
    }

    /// 追加一个常量字段（同名列字段被移除）
    pub fn constant(mut self, id: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert_constant(id.into(), value.into());
        self
    }

    /// 从嵌套映射构建，叶子为列号
    ///
    /// # 示例
    /// {"name": 0, "profile": {"email": 1}} → [("name", 0), ("profile.email", 1)]
    pub fn from_nested(mapping: &Value) -> ImportResult<Self> {
        let tree = mapping.as_object().ok_or_else(|| {
            ImportError::ConfigurationError("字段映射必须是对象".to_string())
        })?;

        let mut result = Self::new();
        for (id, leaf) in dot(tree) {
            let column = match &leaf {
                Value::Number(n) => n.as_u64().map(|c| c as usize),
                Value::String(s) => s.trim().parse::<usize>().ok(),
                _ => None,
            }
            .ok_or_else(|| {
                ImportError::ConfigurationError(format!("字段 {} 的列号无效: {}", id, leaf))
            })?;
            result.insert(id, column);
        }

        Ok(result)
    }

    pub fn entries(&self) -> &[(String, usize)] {
        &self.entries
    }

    pub fn constants(&self) -> &[(String, Value)] {
        &self.constants
    }

    pub fn len(&self) -> usize {
        self.entries.len() + self.constants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty() && self.constants.is_empty()
    }

    fn insert(&mut self, id: String, column: usize) {
        self.constants.retain(|(existing, _)| *existing != id);
        match self.entries.iter_mut().find(|(existing, _)| *existing == id) {
            Some(entry) => entry.1 = column,
            None => self.entries.push((id, column)),
        }
    }

    fn insert_constant(&mut self, id: String, value: Value) {
        self.entries.retain(|(existing, _)| *existing != id);
        match self.constants.iter_mut().find(|(existing, _)| *existing == id) {
            Some(entry) => entry.1 = value,
            None => self.constants.push((id, value)),
        }
    }
}

impl<S: Into<String>> FromIterator<(S, usize)> for FieldMapping {
    fn from_iter<I: IntoIterator<Item = (S, usize)>>(iter: I) -> Self {
        iter.into_iter()
            .fold(Self::new(), |mapping, (id, column)| mapping.map(id, column))
    }
}

// ==========================================
// ImportConfig - 不可变导入配置
// ==========================================
pub struct ImportConfig {
    pub(crate) source: String,
    pub(crate) mapping: FieldMapping,
    pub(crate) schemas: HashMap<String, FieldDescriptor>,
    pub(crate) model: String,
    pub(crate) disk: String,
    pub(crate) skip_header: bool,
    pub(crate) mass_create: bool,
    pub(crate) handle_blank_rows: bool,
    pub(crate) rows_limit: Option<usize>,
    pub(crate) unique_field: Option<String>,
    pub(crate) before_create: Option<BeforeCreateHook>,
    pub(crate) after_create: Option<AfterCreateHook>,
    pub(crate) creation_override: Option<CreationOverride>,
    pub(crate) on_success: Option<CompletionCallback>,
    pub(crate) on_fail: Option<CompletionCallback>,
}

impl ImportConfig {
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn disk(&self) -> &str {
        &self.disk
    }

    pub fn mapping(&self) -> &FieldMapping {
        &self.mapping
    }

    pub fn unique_field(&self) -> Option<&str> {
        self.unique_field.as_deref()
    }

    pub fn rows_limit(&self) -> Option<usize> {
        self.rows_limit
    }

    pub fn is_mass_create(&self) -> bool {
        self.mass_create
    }
}

impl fmt::Debug for ImportConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImportConfig")
            .field("source", &self.source)
            .field("mapping", &self.mapping)
            .field("model", &self.model)
            .field("disk", &self.disk)
            .field("skip_header", &self.skip_header)
            .field("mass_create", &self.mass_create)
            .field("handle_blank_rows", &self.handle_blank_rows)
            .field("rows_limit", &self.rows_limit)
            .field("unique_field", &self.unique_field)
            .field("creation_override", &self.creation_override.is_some())
            .finish_non_exhaustive()
    }
}

// ==========================================
// ImportBuilder
// ==========================================
pub struct ImportBuilder {
    source: String,
    mapping: FieldMapping,
    schemas: HashMap<String, FieldDescriptor>,
    model: Option<String>,
    disk: String,
    skip_header: bool,
    mass_create: bool,
    handle_blank_rows: bool,
    rows_limit: Option<usize>,
    unique_field: Option<String>,
    before_create: Option<BeforeCreateHook>,
    after_create: Option<AfterCreateHook>,
    creation_override: Option<CreationOverride>,
    on_success: Option<CompletionCallback>,
    on_fail: Option<CompletionCallback>,
}

impl ImportBuilder {
    /// 以文件引用开始构建
    pub fn make(source: impl Into<String>) -> Self {
        let defaults = ImportDefaults::default();
        Self {
            source: source.into(),
            mapping: FieldMapping::new(),
            schemas: HashMap::new(),
            model: None,
            disk: defaults.disk,
            skip_header: defaults.skip_header,
            mass_create: defaults.mass_create,
            handle_blank_rows: defaults.handle_blank_rows,
            rows_limit: defaults.rows_limit,
            unique_field: None,
            before_create: None,
            after_create: None,
            creation_override: None,
            on_success: None,
            on_fail: None,
        }
    }

    /// 用配置层读取的默认值覆盖开关项
    pub fn with_defaults(mut self, defaults: &ImportDefaults) -> Self {
        self.disk = defaults.disk.clone();
        self.skip_header = defaults.skip_header;
        self.mass_create = defaults.mass_create;
        self.handle_blank_rows = defaults.handle_blank_rows;
        self.rows_limit = defaults.rows_limit;
        self
    }

    pub fn fields(mut self, mapping: FieldMapping) -> Self {
        self.mapping = mapping;
        self
    }

    pub fn form_schemas<I>(mut self, schemas: I) -> Self
    where
        I: IntoIterator<Item = FieldDescriptor>,
    {
        self.schemas = schemas
            .into_iter()
            .map(|field| (field.id().to_string(), field))
            .collect();
        self
    }

    /// 同时登记字段描述与列号
    pub fn field(mut self, descriptor: FieldDescriptor, column: usize) -> Self {
        self.mapping.insert(descriptor.id().to_string(), column);
        self.schemas.insert(descriptor.id().to_string(), descriptor);
        self
    }

    /// 每行写入同一常量值
    pub fn constant(mut self, id: impl Into<String>, value: impl Into<Value>) -> Self {
        self.mapping.insert_constant(id.into(), value.into());
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn disk(mut self, disk: impl Into<String>) -> Self {
        self.disk = disk.into();
        self
    }

    pub fn skip_header(mut self, skip: bool) -> Self {
        self.skip_header = skip;
        self
    }

    pub fn mass_create(mut self, mass_create: bool) -> Self {
        self.mass_create = mass_create;
        self
    }

    pub fn handle_blank_rows(mut self, handle: bool) -> Self {
        self.handle_blank_rows = handle;
        self
    }

    /// None 或 0 表示不限
    pub fn rows_limit(mut self, limit: Option<usize>) -> Self {
        self.rows_limit = limit.filter(|l| *l > 0);
        self
    }

    pub fn unique_field(mut self, field: impl Into<String>) -> Self {
        self.unique_field = Some(field.into());
        self
    }

    pub fn without_unique_field(mut self) -> Self {
        self.unique_field = None;
        self
    }

    pub fn mutate_before_create<F>(mut self, hook: F) -> Self
    where
        F: Fn(Attributes) -> Attributes + Send + Sync + 'static,
    {
        self.before_create = Some(Arc::new(hook));
        self
    }

    pub fn mutate_after_create<F>(mut self, hook: F) -> Self
    where
        F: Fn(&mut dyn RecordTransaction, &Record, &Attributes) -> ImportResult<()>
            + Send
            + Sync
            + 'static,
    {
        self.after_create = Some(Arc::new(hook));
        self
    }

    pub fn handle_record_creation<F>(mut self, create: F) -> Self
    where
        F: Fn(&mut dyn RecordTransaction, &Attributes) -> ImportResult<Record>
            + Send
            + Sync
            + 'static,
    {
        self.creation_override = Some(Arc::new(create));
        self
    }

    pub fn without_record_creation_override(mut self) -> Self {
        self.creation_override = None;
        self
    }

    pub fn run_on_success<F>(mut self, callback: F) -> Self
    where
        F: FnOnce(&ExecutionResult) + Send + 'static,
    {
        self.on_success = Some(Box::new(callback));
        self
    }

    pub fn run_on_fail<F>(mut self, callback: F) -> Self
    where
        F: FnOnce(&ExecutionResult) + Send + 'static,
    {
        self.on_fail = Some(Box::new(callback));
        self
    }

    /// 校验并冻结配置
    ///
    /// # 错误
    /// - ConfigurationError: 未指定文件/记录类型/字段映射
    /// - MissingFieldDescriptor: 映射字段缺少描述
    /// - Repository(InvalidIdentifier): 记录类型名非法
    pub fn build(self) -> ImportResult<ImportConfig> {
        self.into_config().map_err(|(err, _)| err)
    }

    /// 构建并执行（配置错误同样走失败回调 + 通知）
    pub fn execute<S, N>(self, executor: &mut ImportExecutor<S, N>) -> ExecutionResult
    where
        S: RecordStore,
        N: Notifier,
    {
        executor.execute_builder(self)
    }

    /// 构建失败时交回失败回调
    pub(crate) fn into_config(
        self,
    ) -> Result<ImportConfig, (ImportError, Option<CompletionCallback>)> {
        if let Err(err) = self.check() {
            return Err((err, self.on_fail));
        }

        Ok(ImportConfig {
            source: self.source,
            mapping: self.mapping,
            schemas: self.schemas,
            model: self.model.unwrap_or_default(),
            disk: self.disk,
            skip_header: self.skip_header,
            mass_create: self.mass_create,
            handle_blank_rows: self.handle_blank_rows,
            rows_limit: self.rows_limit,
            unique_field: self.unique_field,
            before_create: self.before_create,
            after_create: self.after_create,
            creation_override: self.creation_override,
            on_success: self.on_success,
            on_fail: self.on_fail,
        })
    }

    fn check(&self) -> ImportResult<()> {
        if self.source.trim().is_empty() {
            return Err(ImportError::ConfigurationError("未指定导入文件".to_string()));
        }

        let model = self
            .model
            .as_deref()
            .filter(|m| !m.trim().is_empty())
            .ok_or_else(|| ImportError::ConfigurationError("未指定记录类型".to_string()))?;
        validate_identifier(model)?;

        if self.mapping.is_empty() {
            return Err(ImportError::ConfigurationError("未配置字段映射".to_string()));
        }

        if let Some((id, _)) = self
            .mapping
            .entries()
            .iter()
            .find(|(id, _)| !self.schemas.contains_key(id))
        {
            return Err(ImportError::MissingFieldDescriptor(id.clone()));
        }

        if self.disk.trim().is_empty() {
            return Err(ImportError::ConfigurationError("未指定存储盘".to_string()));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::error::RepositoryError;
    use serde_json::json;

    #[test]
    fn test_from_nested_mapping() {
        let mapping =
            FieldMapping::from_nested(&json!({"name": 0, "profile": {"email": 1, "phone": "2"}}))
                .unwrap();
        assert_eq!(
            mapping.entries(),
            &[
                ("name".to_string(), 0),
                ("profile.email".to_string(), 1),
                ("profile.phone".to_string(), 2),
            ]
        );

        assert!(matches!(
            FieldMapping::from_nested(&json!({"name": "first"})),
            Err(ImportError::ConfigurationError(_))
        ));
        assert!(FieldMapping::from_nested(&json!([0, 1])).is_err());
    }

    #[test]
    fn test_mapping_keeps_first_position_on_override() {
        let mapping: FieldMapping = [("a", 0), ("b", 1), ("a", 5)].into_iter().collect();
        assert_eq!(
            mapping.entries(),
            &[("a".to_string(), 5), ("b".to_string(), 1)]
        );
    }

    #[test]
    fn test_constant_replaces_column_entry() {
        let mapping = FieldMapping::new()
            .map("name", 0)
            .map("team", 1)
            .constant("team", "ops")
            .constant("active", true);

        assert_eq!(mapping.entries(), &[("name".to_string(), 0)]);
        assert_eq!(
            mapping.constants(),
            &[
                ("team".to_string(), json!("ops")),
                ("active".to_string(), json!(true)),
            ]
        );
        assert_eq!(mapping.len(), 3);

        let mapping = mapping.map("team", 2);
        assert_eq!(mapping.entries().len(), 2);
        assert_eq!(mapping.constants(), &[("active".to_string(), json!(true))]);
    }

    #[test]
    fn test_build_defaults() {
        let config = ImportBuilder::make("users.csv")
            .model("users")
            .field(FieldDescriptor::new("name").required(true), 0)
            .build()
            .unwrap();

        assert_eq!(config.source(), "users.csv");
        assert_eq!(config.disk(), "local");
        assert!(config.is_mass_create());
        assert!(!config.skip_header);
        assert!(!config.handle_blank_rows);
        assert_eq!(config.rows_limit(), None);
        assert_eq!(config.unique_field(), None);
    }

    #[test]
    fn test_with_defaults_and_overrides() {
        let defaults = ImportDefaults {
            disk: "uploads".to_string(),
            skip_header: true,
            mass_create: false,
            handle_blank_rows: true,
            rows_limit: Some(100),
        };

        let config = ImportBuilder::make("users.csv")
            .with_defaults(&defaults)
            .rows_limit(Some(0))
            .model("users")
            .unique_field("email")
            .fields(FieldMapping::new().map("email", 0))
            .form_schemas(vec![FieldDescriptor::new("email")])
            .build()
            .unwrap();

        assert_eq!(config.disk(), "uploads");
        assert!(config.skip_header);
        assert!(!config.is_mass_create());
        assert_eq!(config.rows_limit(), None);
        assert_eq!(config.unique_field(), Some("email"));
    }

    #[test]
    fn test_build_rejects_incomplete_configuration() {
        let missing_model = ImportBuilder::make("users.csv")
            .field(FieldDescriptor::new("name"), 0)
            .build();
        assert!(matches!(
            missing_model,
            Err(ImportError::ConfigurationError(_))
        ));

        let bad_model = ImportBuilder::make("users.csv")
            .model("users; --")
            .field(FieldDescriptor::new("name"), 0)
            .build();
        assert!(matches!(
            bad_model,
            Err(ImportError::Repository(RepositoryError::InvalidIdentifier(_)))
        ));

        let missing_schema = ImportBuilder::make("users.csv")
            .model("users")
            .fields(FieldMapping::new().map("name", 0).map("email", 1))
            .form_schemas(vec![FieldDescriptor::new("name")])
            .build();
        assert!(matches!(
            missing_schema,
            Err(ImportError::MissingFieldDescriptor(id)) if id == "email"
        ));
    }
}
