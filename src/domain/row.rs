// ==========================================
// 表格批量导入引擎 - 源数据行
// ==========================================

use serde::Serialize;
use serde_json::Value;

static NULL_CELL: Value = Value::Null;

/// 表格中的一行（按列位置索引）
///
/// index 为该行在工作表中的 0 基行号（表头行占用 0），
/// 对外展示的行号为 index + 1
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SheetRow {
    pub index: usize,
    pub cells: Vec<Value>,
}

impl SheetRow {
    pub fn new(index: usize, cells: Vec<Value>) -> Self {
        Self { index, cells }
    }

    /// 读取指定列，越界视为空单元格
    pub fn get(&self, column: usize) -> &Value {
        self.cells.get(column).unwrap_or(&NULL_CELL)
    }

    /// 面向用户的行号
    pub fn line_number(&self) -> usize {
        self.index + 1
    }

    /// 整行是否全部为空
    pub fn is_blank(&self) -> bool {
        self.cells.iter().all(super::attributes::is_blank)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_out_of_range_column_is_null() {
        let row = SheetRow::new(0, vec![json!("a")]);
        assert_eq!(row.get(0), &json!("a"));
        assert_eq!(row.get(5), &Value::Null);
    }

    #[test]
    fn test_blank_row() {
        assert!(SheetRow::new(3, vec![json!(" "), Value::Null]).is_blank());
        assert!(!SheetRow::new(3, vec![json!(" "), json!(0)]).is_blank());
        assert_eq!(SheetRow::new(3, vec![]).line_number(), 4);
    }
}
