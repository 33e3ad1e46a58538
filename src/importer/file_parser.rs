// ==========================================
// 表格批量导入引擎 - 文件解析器实现
// ==========================================
// 职责: 将表格文件的第一个工作表解码为按列位置排列的单元格行
// 支持: CSV (.csv) / Excel (.xlsx/.xlsm/.xls/.xlsb) / ODS (.ods)
// ==========================================

use crate::importer::error::{ImportError, ImportResult};
use calamine::{open_workbook_auto, open_workbook_auto_from_rs, Data, Range, Reader, Sheets};
use csv::ReaderBuilder;
use serde_json::{Number, Value};
use std::fs::File;
use std::io::{Cursor, Read, Seek};
use std::path::Path;

/// 解码后的原始行（不含行号）
pub type RawRows = Vec<Vec<Value>>;

// ==========================================
// FileParser Trait
// ==========================================
// 用途: 文件解码接口
// 实现者: CsvParser, ExcelParser
pub trait FileParser: Send + Sync {
    /// 从本地路径解码
    fn parse_path(&self, path: &Path) -> ImportResult<RawRows>;

    /// 从内存字节解码（远程盘）
    fn parse_bytes(&self, bytes: &[u8]) -> ImportResult<RawRows>;
}

// ==========================================
// CSV Parser 实现
// ==========================================
pub struct CsvParser;

impl CsvParser {
    fn read_rows<R: Read>(reader: R) -> ImportResult<RawRows> {
        let mut reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true) // 允许行长度不一致
            .from_reader(reader);

        let mut rows = Vec::new();
        for result in reader.records() {
            let record = result?;
            let mut cells: Vec<Value> = record.iter().map(csv_cell).collect();

            // 去掉首个单元格的 UTF-8 BOM
            if rows.is_empty() {
                if let Some(Value::String(first)) = cells.first_mut() {
                    if let Some(stripped) = first.strip_prefix('\u{feff}') {
                        *first = stripped.to_string();
                    }
                }
            }

            rows.push(cells);
        }

        Ok(rows)
    }
}

fn csv_cell(raw: &str) -> Value {
    if raw.is_empty() {
        Value::Null
    } else {
        Value::String(raw.to_string())
    }
}

impl FileParser for CsvParser {
    fn parse_path(&self, path: &Path) -> ImportResult<RawRows> {
        // 检查文件存在
        if !path.exists() {
            return Err(ImportError::FileNotFound(path.display().to_string()));
        }

        let file = File::open(path)?;
        Self::read_rows(file)
    }

    fn parse_bytes(&self, bytes: &[u8]) -> ImportResult<RawRows> {
        Self::read_rows(bytes)
    }
}

// ==========================================
// Excel Parser 实现
// ==========================================
pub struct ExcelParser;

impl ExcelParser {
    /// 读取第一个 sheet
    fn read_first_sheet<RS: Read + Seek>(workbook: &mut Sheets<RS>) -> ImportResult<RawRows> {
        let sheet_names = workbook.sheet_names();
        let sheet_name = sheet_names
            .first()
            .cloned()
            .ok_or_else(|| ImportError::ExcelParseError("Excel 文件无工作表".to_string()))?;

        let range = workbook.worksheet_range(&sheet_name)?;
        Ok(range_to_rows(&range))
    }
}

impl FileParser for ExcelParser {
    fn parse_path(&self, path: &Path) -> ImportResult<RawRows> {
        // 检查文件存在
        if !path.exists() {
            return Err(ImportError::FileNotFound(path.display().to_string()));
        }

        let mut workbook = open_workbook_auto(path)?;
        Self::read_first_sheet(&mut workbook)
    }

    fn parse_bytes(&self, bytes: &[u8]) -> ImportResult<RawRows> {
        let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))?;
        Self::read_first_sheet(&mut workbook)
    }
}

/// Range 转原始行
///
/// calamine 的 Range 从第一个非空单元格开始，这里补齐前导空行/空列，
/// 保证列位置与工作表一致
fn range_to_rows(range: &Range<Data>) -> RawRows {
    let (row_offset, col_offset) = range.start().unwrap_or((0, 0));

    let mut rows: RawRows = (0..row_offset).map(|_| Vec::new()).collect();
    for data_row in range.rows() {
        let mut cells = vec![Value::Null; col_offset as usize];
        cells.extend(data_row.iter().map(cell_to_value));
        rows.push(cells);
    }
    rows
}

/// 单元格转 JSON 值
pub fn cell_to_value(cell: &Data) -> Value {
    match cell {
        Data::Empty => Value::Null,
        Data::String(s) if s.is_empty() => Value::Null,
        Data::String(s) => Value::String(s.clone()),
        Data::Int(i) => Value::Number((*i).into()),
        Data::Float(f) => Number::from_f64(*f).map(Value::Number).unwrap_or(Value::Null),
        Data::Bool(b) => Value::Bool(*b),
        other => Value::String(other.to_string()),
    }
}

// ==========================================
// 通用文件解析器（根据扩展名自动选择）
// ==========================================
pub struct UniversalFileParser;

impl UniversalFileParser {
    /// 根据文件引用的扩展名选择解析器
    pub fn for_reference(reference: &str) -> ImportResult<Box<dyn FileParser>> {
        let ext = Path::new(reference)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();

        match ext.as_str() {
            "csv" | "txt" => Ok(Box::new(CsvParser)),
            "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => Ok(Box::new(ExcelParser)),
            _ => Err(ImportError::UnsupportedFormat(reference.to_string())),
        }
    }

    pub fn parse_path<P: AsRef<Path>>(&self, path: P) -> ImportResult<RawRows> {
        let path = path.as_ref();
        let parser = Self::for_reference(&path.to_string_lossy())?;
        parser.parse_path(path)
    }

    pub fn parse_bytes(&self, reference: &str, bytes: &[u8]) -> ImportResult<RawRows> {
        let parser = Self::for_reference(reference)?;
        parser.parse_bytes(bytes)
    }
}
