// ==========================================
// 表格批量导入引擎 - 行数据源
// ==========================================
// 职责: 读取存储盘上的表格文件，产出有序、可随机访问的行序列
// 流程: 解码 → 跳过表头 → 行数上限检查 → 过滤空白行
// 约束: 超出行数上限时不返回任何行（不做部分导入）
// ==========================================

use crate::domain::row::SheetRow;
use crate::importer::disk::Disk;
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::file_parser::{RawRows, UniversalFileParser};
use tracing::debug;

#[derive(Debug, Clone, Copy, Default)]
pub struct RowSource {
    skip_header: bool,
    handle_blank_rows: bool,
    rows_limit: Option<usize>,
}

impl RowSource {
    /// # 参数
    /// - skip_header: 丢弃第 0 行
    /// - handle_blank_rows: 过滤全空行
    /// - rows_limit: 跳过表头后允许的最大行数（0 视为不限）
    pub fn new(skip_header: bool, handle_blank_rows: bool, rows_limit: Option<usize>) -> Self {
        Self {
            skip_header,
            handle_blank_rows,
            rows_limit: rows_limit.filter(|limit| *limit > 0),
        }
    }

    /// 从存储盘加载行
    pub fn load(&self, disk: &dyn Disk, reference: &str) -> ImportResult<Vec<SheetRow>> {
        let raw = if disk.is_remote() {
            let bytes = disk.read(reference)?;
            UniversalFileParser.parse_bytes(reference, &bytes)?
        } else {
            UniversalFileParser.parse_path(disk.path(reference))?
        };

        debug!(reference = %reference, remote = disk.is_remote(), rows = raw.len(), "表格解码完成");
        self.prepare(raw)
    }

    /// 对解码后的原始行应用表头/上限/空行规则
    pub fn prepare(&self, raw: RawRows) -> ImportResult<Vec<SheetRow>> {
        let skip = usize::from(self.skip_header);
        let mut rows: Vec<SheetRow> = raw
            .into_iter()
            .enumerate()
            .skip(skip)
            .map(|(index, cells)| SheetRow::new(index, cells))
            .collect();

        if let Some(limit) = self.rows_limit {
            if rows.len() > limit {
                return Err(ImportError::RowLimitExceeded(limit));
            }
        }

        if self.handle_blank_rows {
            rows.retain(|row| !row.is_blank());
        }

        Ok(rows)
    }
}
