// ==========================================
// 表格批量导入引擎 - 持久化记录
// ==========================================

use crate::domain::attributes::{get_path, Attributes};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// 目标记录类型的一条记录
///
/// - model: 记录类型（SQLite 中即表名）
/// - id: 持久化后分配的主键，未保存时为 None
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub model: String,
    pub id: Option<i64>,
    pub attributes: Attributes,
}

impl Record {
    /// 实例化一条未保存的空记录
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            id: None,
            attributes: Attributes::new(),
        }
    }

    /// 填充属性（同名键覆盖）
    pub fn fill(&mut self, attributes: &Attributes) -> &mut Self {
        for (key, value) in attributes {
            self.attributes.insert(key.clone(), value.clone());
        }
        self
    }

    /// 按点路径读取属性
    pub fn get(&self, path: &str) -> Option<&Value> {
        get_path(&self.attributes, path)
    }

    /// 是否已持久化
    pub fn exists(&self) -> bool {
        self.id.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_fill_overwrites_and_reads_nested() {
        let mut record = Record::new("users");
        let first = json!({"name": "A", "profile": {"email": "a@x.io"}});
        let second = json!({"name": "B"});

        record.fill(first.as_object().unwrap());
        record.fill(second.as_object().unwrap());

        assert_eq!(record.get("name"), Some(&json!("B")));
        assert_eq!(record.get("profile.email"), Some(&json!("a@x.io")));
        assert!(!record.exists());
    }
}
