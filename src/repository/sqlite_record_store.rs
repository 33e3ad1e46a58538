// ==========================================
// 表格批量导入引擎 - SQLite 记录仓储实现
// ==========================================
// 职责: 使用 rusqlite 实现事务化的记录创建/查找
// 映射: 记录类型 = 表名，顶层属性 = 列，嵌套对象/数组以 JSON 文本存储
// 约束: 所有值参数化；表名/列名经标识符校验后加引号拼接
// ==========================================

use crate::db::{configure_sqlite_connection, open_sqlite_connection};
use crate::domain::attributes::Attributes;
use crate::domain::record::Record;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::record_store::{
    validate_identifier, RecordStore, RecordTransaction, TransactionOutcome,
};
use rusqlite::types::{Value as SqlValue, ValueRef};
use rusqlite::{params_from_iter, Connection, TransactionBehavior};
use serde_json::{Number, Value};
use tracing::debug;

// ==========================================
// SqliteRecordStore
// ==========================================
pub struct SqliteRecordStore {
    conn: Connection,
}

impl SqliteRecordStore {
    /// 创建新的仓储实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)?;
        Ok(Self { conn })
    }

    /// 从已有连接创建（会再次应用统一 PRAGMA，幂等）
    pub fn from_connection(conn: Connection) -> RepositoryResult<Self> {
        configure_sqlite_connection(&conn)?;
        Ok(Self { conn })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// 统计某类型的已提交记录数
    pub fn count(&self, model: &str) -> RepositoryResult<usize> {
        let table = validate_identifier(model)?;
        let count: i64 = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM \"{}\"", table),
            [],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    /// 读取某类型的全部已提交记录（按 rowid 排序）
    pub fn all(&self, model: &str) -> RepositoryResult<Vec<Record>> {
        let table = validate_identifier(model)?;
        let sql = format!("SELECT rowid AS __rowid, * FROM \"{}\" ORDER BY rowid", table);
        query_records(&self.conn, model, &sql, &[])
    }
}

impl RecordStore for SqliteRecordStore {
    fn transaction<T, E, F>(&mut self, body: F) -> Result<T, E>
    where
        F: FnOnce(&mut dyn RecordTransaction) -> Result<TransactionOutcome<T>, E>,
        E: From<RepositoryError>,
    {
        // IMMEDIATE: 开启即持有写锁，避免导入中途被其他写者抢占
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;

        let outcome = {
            let mut handle = SqliteTransaction { conn: &tx };
            body(&mut handle)?
        };

        match outcome {
            TransactionOutcome::Commit(value) => {
                tx.commit()
                    .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;
                debug!("事务已提交");
                Ok(value)
            }
            TransactionOutcome::Rollback(value) => {
                tx.rollback()
                    .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;
                debug!("事务已回滚");
                Ok(value)
            }
        }
    }
}

// ==========================================
// SqliteTransaction
// ==========================================
struct SqliteTransaction<'c> {
    conn: &'c Connection,
}

impl RecordTransaction for SqliteTransaction<'_> {
    fn create(&mut self, model: &str, attributes: &Attributes) -> RepositoryResult<Record> {
        let id = insert_row(self.conn, model, attributes)?;

        // 回读，带上数据库默认值
        let table = validate_identifier(model)?;
        let sql = format!(
            "SELECT rowid AS __rowid, * FROM \"{}\" WHERE rowid = ?1",
            table
        );
        query_records(self.conn, model, &sql, &[SqlValue::Integer(id)])?
            .pop()
            .ok_or_else(|| RepositoryError::NotFound {
                entity: model.to_string(),
                id: id.to_string(),
            })
    }

    fn save(&mut self, record: &mut Record) -> RepositoryResult<()> {
        let id = insert_row(self.conn, &record.model, &record.attributes)?;
        record.id = Some(id);
        Ok(())
    }

    fn find_where(
        &mut self,
        model: &str,
        field: &str,
        value: &Value,
    ) -> RepositoryResult<Option<Record>> {
        let table = validate_identifier(model)?;
        let target = column_expression(field)?;
        let sql = format!(
            "SELECT rowid AS __rowid, * FROM \"{}\" WHERE {} = ?1 LIMIT 1",
            table, target
        );

        Ok(query_records(self.conn, model, &sql, &[to_sql_value(value)])?.pop())
    }
}

// ==========================================
// SQL 辅助
// ==========================================

fn insert_row(conn: &Connection, model: &str, attributes: &Attributes) -> RepositoryResult<i64> {
    let table = validate_identifier(model)?;

    if attributes.is_empty() {
        conn.execute(&format!("INSERT INTO \"{}\" DEFAULT VALUES", table), [])?;
        return Ok(conn.last_insert_rowid());
    }

    let columns = attributes
        .keys()
        .map(|key| validate_identifier(key).map(|c| format!("\"{}\"", c)))
        .collect::<RepositoryResult<Vec<_>>>()?;
    let placeholders: Vec<String> = (1..=columns.len()).map(|i| format!("?{}", i)).collect();

    let sql = format!(
        "INSERT INTO \"{}\" ({}) VALUES ({})",
        table,
        columns.join(", "),
        placeholders.join(", ")
    );

    let values: Vec<SqlValue> = attributes.values().map(to_sql_value).collect();
    conn.execute(&sql, params_from_iter(values.iter()))?;
    Ok(conn.last_insert_rowid())
}

/// 点路径字段 → SQL 表达式（嵌套部分走 json_extract）
fn column_expression(field: &str) -> RepositoryResult<String> {
    match field.split_once('.') {
        None => Ok(format!("\"{}\"", validate_identifier(field)?)),
        Some((column, path)) => {
            let column = validate_identifier(column)?;
            for segment in path.split('.') {
                validate_identifier(segment)?;
            }
            Ok(format!("json_extract(\"{}\", '$.{}')", column, path))
        }
    }
}

fn query_records(
    conn: &Connection,
    model: &str,
    sql: &str,
    params: &[SqlValue],
) -> RepositoryResult<Vec<Record>> {
    let mut stmt = conn.prepare(sql)?;
    let columns: Vec<String> = stmt.column_names().iter().map(|c| c.to_string()).collect();

    let mut rows = stmt.query(params_from_iter(params.iter()))?;
    let mut records = Vec::new();
    while let Some(row) = rows.next()? {
        let id: i64 = row.get(0)?;
        let mut attributes = Attributes::new();
        for (idx, name) in columns.iter().enumerate().skip(1) {
            attributes.insert(name.clone(), from_sql_value(row.get_ref(idx)?));
        }
        records.push(Record {
            model: model.to_string(),
            id: Some(id),
            attributes,
        });
    }

    Ok(records)
}

/// JSON 值 → SQLite 值
pub(crate) fn to_sql_value(value: &Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Bool(b) => SqlValue::Integer(i64::from(*b)),
        Value::Number(n) => match n.as_i64() {
            Some(i) => SqlValue::Integer(i),
            None => SqlValue::Real(n.as_f64().unwrap_or_default()),
        },
        Value::String(s) => SqlValue::Text(s.clone()),
        other => SqlValue::Text(other.to_string()),
    }
}

/// SQLite 值 → JSON 值（JSON 文本列还原为嵌套结构）
fn from_sql_value(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::from(i),
        ValueRef::Real(f) => Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null),
        ValueRef::Text(bytes) => {
            let text = String::from_utf8_lossy(bytes);
            let trimmed = text.trim_start();
            if trimmed.starts_with('{') || trimmed.starts_with('[') {
                if let Ok(parsed) = serde_json::from_str::<Value>(&text) {
                    return parsed;
                }
            }
            Value::String(text.into_owned())
        }
        ValueRef::Blob(bytes) => Value::Array(bytes.iter().map(|b| Value::from(*b)).collect()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn store() -> SqliteRecordStore {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE users (
                id INTEGER PRIMARY KEY,
                email TEXT UNIQUE,
                name TEXT,
                profile TEXT,
                active INTEGER NOT NULL DEFAULT 1
            );",
        )
        .unwrap();
        SqliteRecordStore::from_connection(conn).unwrap()
    }

    fn attrs(value: Value) -> Attributes {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_create_reads_back_defaults() {
        let mut store = store();
        let record: RepositoryResult<Record> = store.transaction(|tx| {
            let record = tx.create("users", &attrs(json!({"email": "a@x.io", "name": "A"})))?;
            Ok(TransactionOutcome::Commit(record))
        });

        let record = record.unwrap();
        assert_eq!(record.id, Some(1));
        assert_eq!(record.get("active"), Some(&json!(1)));
        assert_eq!(store.count("users").unwrap(), 1);
    }

    #[test]
    fn test_fill_and_save_with_nested_json_column() {
        let mut store = store();
        let saved: RepositoryResult<Record> = store.transaction(|tx| {
            let record = tx.fill_and_save(
                "users",
                &attrs(json!({"email": "b@x.io", "profile": {"city": "Lyon"}})),
            )?;
            Ok(TransactionOutcome::Commit(record))
        });
        assert!(saved.unwrap().exists());

        let all = store.all("users").unwrap();
        assert_eq!(all[0].get("profile.city"), Some(&json!("Lyon")));

        let found: RepositoryResult<Option<Record>> = store.transaction(|tx| {
            Ok(TransactionOutcome::Commit(tx.find_where(
                "users",
                "profile.city",
                &json!("Lyon"),
            )?))
        });
        assert!(found.unwrap().is_some());
    }

    #[test]
    fn test_rollback_discards_inserts() {
        let mut store = store();
        let visible: RepositoryResult<bool> = store.transaction(|tx| {
            tx.create("users", &attrs(json!({"email": "a@x.io"})))?;
            let found = tx.find_where("users", "email", &json!("a@x.io"))?;
            Ok(TransactionOutcome::Rollback(found.is_some()))
        });

        assert!(visible.unwrap());
        assert_eq!(store.count("users").unwrap(), 0);
    }

    #[test]
    fn test_unique_violation_maps_to_repository_error() {
        let mut store = store();
        let result: RepositoryResult<()> = store.transaction(|tx| {
            tx.create("users", &attrs(json!({"email": "a@x.io"})))?;
            tx.create("users", &attrs(json!({"email": "a@x.io"})))?;
            Ok(TransactionOutcome::Commit(()))
        });

        assert!(matches!(
            result,
            Err(RepositoryError::UniqueConstraintViolation(_))
        ));
        assert_eq!(store.count("users").unwrap(), 0);
    }

    #[test]
    fn test_rejects_unsafe_identifiers() {
        let mut store = store();
        let result: RepositoryResult<()> = store.transaction(|tx| {
            tx.create("users", &attrs(json!({"email\"; DROP TABLE users; --": "x"})))?;
            Ok(TransactionOutcome::Commit(()))
        });
        assert!(matches!(result, Err(RepositoryError::InvalidIdentifier(_))));
        assert!(column_expression("profile.$bad").is_err());
    }
}
