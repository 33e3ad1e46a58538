// ==========================================
// 表格批量导入引擎 - 导入配置读取 Trait
// ==========================================
// 职责: 定义导入模块所需的配置读取接口（不包含实现）
// 红线: 不包含配置写入、不包含业务逻辑
// ==========================================

use async_trait::async_trait;
use std::error::Error;

/// 导入开关项的默认值
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportDefaults {
    /// 存储盘名称
    pub disk: String,
    pub skip_header: bool,
    /// true: 一步创建；false: 实例化 → 填充 → 保存
    pub mass_create: bool,
    pub handle_blank_rows: bool,
    /// None 表示不限
    pub rows_limit: Option<usize>,
}

impl Default for ImportDefaults {
    fn default() -> Self {
        Self {
            disk: "local".to_string(),
            skip_header: false,
            mass_create: true,
            handle_blank_rows: false,
            rows_limit: None,
        }
    }
}

// ==========================================
// ImportConfigReader Trait
// ==========================================
// 用途: 导入模块所需的配置读取接口
// 实现者: ConfigManager（从 config_kv 表读取）
#[async_trait]
pub trait ImportConfigReader: Send + Sync {
    /// 获取默认存储盘
    ///
    /// # 默认值
    /// - "local"
    async fn get_default_disk(&self) -> Result<String, Box<dyn Error + Send + Sync>>;

    /// 是否跳过表头
    ///
    /// # 默认值
    /// - false
    async fn get_skip_header(&self) -> Result<bool, Box<dyn Error + Send + Sync>>;

    /// 是否一步创建记录
    ///
    /// # 默认值
    /// - true
    async fn get_mass_create(&self) -> Result<bool, Box<dyn Error + Send + Sync>>;

    /// 是否过滤全空行
    ///
    /// # 默认值
    /// - false
    async fn get_handle_blank_rows(&self) -> Result<bool, Box<dyn Error + Send + Sync>>;

    /// 行数上限
    ///
    /// # 返回
    /// - None: 不限（未配置、0 或无法解析）
    async fn get_rows_limit(&self) -> Result<Option<usize>, Box<dyn Error + Send + Sync>>;

    /// 一次读取全部导入默认值
    async fn load_defaults(&self) -> Result<ImportDefaults, Box<dyn Error + Send + Sync>> {
        Ok(ImportDefaults {
            disk: self.get_default_disk().await?,
            skip_header: self.get_skip_header().await?,
            mass_create: self.get_mass_create().await?,
            handle_blank_rows: self.get_handle_blank_rows().await?,
            rows_limit: self.get_rows_limit().await?,
        })
    }
}
