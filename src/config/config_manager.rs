// ==========================================
// 表格批量导入引擎 - 配置管理器
// ==========================================
// 职责: 导入默认值的加载、查询、覆写
// 存储: config_kv 表 (key-value + scope)
// ==========================================

use crate::config::import_config_trait::{ImportConfigReader, ImportDefaults};
use crate::db::{configure_sqlite_connection, open_sqlite_connection};
use async_trait::async_trait;
use rusqlite::{params, Connection};
use std::error::Error;
use std::sync::{Arc, Mutex};

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例（自动建表）
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> Result<Self, Box<dyn Error + Send + Sync>> {
        let conn = open_sqlite_connection(db_path)?;
        let manager = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        manager.ensure_schema()?;
        Ok(manager)
    }

    /// 从已有连接创建 ConfigManager
    ///
    /// 说明：为保证连接行为一致，会对传入连接再次应用统一 PRAGMA（幂等）。
    pub fn from_connection(
        conn: Arc<Mutex<Connection>>,
    ) -> Result<Self, Box<dyn Error + Send + Sync>> {
        {
            let conn_guard = conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
            configure_sqlite_connection(&conn_guard)?;
        }

        let manager = Self { conn };
        manager.ensure_schema()?;
        Ok(manager)
    }

    /// 建表（幂等）
    pub fn ensure_schema(&self) -> Result<(), Box<dyn Error + Send + Sync>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS config_kv (
                scope_id TEXT NOT NULL,
                key TEXT NOT NULL,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL DEFAULT (datetime('now')),
                PRIMARY KEY (scope_id, key)
            );
            "#,
        )?;
        Ok(())
    }

    /// 从 config_kv 表读取配置值（scope_id='global'）
    ///
    /// # 返回
    /// - Some(String): 配置值
    /// - None: 配置不存在
    pub fn get_config_value(&self, key: &str) -> Result<Option<String>, Box<dyn Error + Send + Sync>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let result = conn.query_row(
            "SELECT value FROM config_kv WHERE scope_id = 'global' AND key = ?1",
            params![key],
            |row| row.get::<_, String>(0),
        );

        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(Box::new(e)),
        }
    }

    /// 写入 global scope 的配置值（存在则覆盖）
    pub fn set_config_value(&self, key: &str, value: &str) -> Result<(), Box<dyn Error + Send + Sync>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
        conn.execute(
            "INSERT INTO config_kv (scope_id, key, value) VALUES ('global', ?1, ?2)
             ON CONFLICT(scope_id, key) DO UPDATE SET value = ?2, updated_at = datetime('now')",
            params![key, value],
        )?;
        Ok(())
    }

    fn get_config_or_default(
        &self,
        key: &str,
        default: &str,
    ) -> Result<String, Box<dyn Error + Send + Sync>> {
        Ok(self
            .get_config_value(key)?
            .unwrap_or_else(|| default.to_string()))
    }

    fn get_flag(&self, key: &str, default: bool) -> Result<bool, Box<dyn Error + Send + Sync>> {
        let value = self.get_config_value(key)?;
        Ok(value.as_deref().and_then(parse_flag).unwrap_or(default))
    }
}

/// 解析开关值（无法识别时返回 None）
fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

// ==========================================
// ImportConfigReader 实现
// ==========================================
#[async_trait]
impl ImportConfigReader for ConfigManager {
    async fn get_default_disk(&self) -> Result<String, Box<dyn Error + Send + Sync>> {
        let defaults = ImportDefaults::default();
        let value = self.get_config_or_default(config_keys::DEFAULT_DISK, &defaults.disk)?;
        let value = value.trim();
        if value.is_empty() {
            Ok(defaults.disk)
        } else {
            Ok(value.to_string())
        }
    }

    async fn get_skip_header(&self) -> Result<bool, Box<dyn Error + Send + Sync>> {
        self.get_flag(config_keys::SKIP_HEADER, ImportDefaults::default().skip_header)
    }

    async fn get_mass_create(&self) -> Result<bool, Box<dyn Error + Send + Sync>> {
        self.get_flag(config_keys::MASS_CREATE, ImportDefaults::default().mass_create)
    }

    async fn get_handle_blank_rows(&self) -> Result<bool, Box<dyn Error + Send + Sync>> {
        self.get_flag(
            config_keys::HANDLE_BLANK_ROWS,
            ImportDefaults::default().handle_blank_rows,
        )
    }

    async fn get_rows_limit(&self) -> Result<Option<usize>, Box<dyn Error + Send + Sync>> {
        let value = self.get_config_value(config_keys::ROWS_LIMIT)?;
        Ok(value
            .and_then(|v| v.trim().parse::<usize>().ok())
            .filter(|limit| *limit > 0))
    }
}

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    // 存储
    pub const DEFAULT_DISK: &str = "import.default_disk";

    // 行处理
    pub const SKIP_HEADER: &str = "import.skip_header";
    pub const HANDLE_BLANK_ROWS: &str = "import.handle_blank_rows";
    pub const ROWS_LIMIT: &str = "import.rows_limit";

    // 记录创建
    pub const MASS_CREATE: &str = "import.mass_create";
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> ConfigManager {
        let conn = Connection::open_in_memory().unwrap();
        ConfigManager::from_connection(Arc::new(Mutex::new(conn))).unwrap()
    }

    #[tokio::test]
    async fn test_defaults_when_table_empty() {
        let manager = manager();
        let defaults = manager.load_defaults().await.unwrap();
        assert_eq!(defaults, ImportDefaults::default());
    }

    #[tokio::test]
    async fn test_overrides_from_config_kv() {
        let manager = manager();
        manager.set_config_value(config_keys::DEFAULT_DISK, "uploads").unwrap();
        manager.set_config_value(config_keys::SKIP_HEADER, "yes").unwrap();
        manager.set_config_value(config_keys::MASS_CREATE, "0").unwrap();
        manager.set_config_value(config_keys::HANDLE_BLANK_ROWS, "TRUE").unwrap();
        manager.set_config_value(config_keys::ROWS_LIMIT, "500").unwrap();

        let defaults = manager.load_defaults().await.unwrap();
        assert_eq!(defaults.disk, "uploads");
        assert!(defaults.skip_header);
        assert!(!defaults.mass_create);
        assert!(defaults.handle_blank_rows);
        assert_eq!(defaults.rows_limit, Some(500));
    }

    #[tokio::test]
    async fn test_invalid_values_fall_back() {
        let manager = manager();
        manager.set_config_value(config_keys::SKIP_HEADER, "maybe").unwrap();
        manager.set_config_value(config_keys::ROWS_LIMIT, "0").unwrap();
        assert!(!manager.get_skip_header().await.unwrap());
        assert_eq!(manager.get_rows_limit().await.unwrap(), None);

        manager.set_config_value(config_keys::ROWS_LIMIT, "abc").unwrap();
        assert_eq!(manager.get_rows_limit().await.unwrap(), None);
    }

    #[test]
    fn test_set_config_value_overwrites() {
        let manager = manager();
        manager.set_config_value("k", "1").unwrap();
        manager.set_config_value("k", "2").unwrap();
        assert_eq!(manager.get_config_value("k").unwrap(), Some("2".to_string()));
        assert_eq!(manager.get_config_value("missing").unwrap(), None);
    }
}
