// ==========================================
// 表格批量导入引擎 - 字段管道
// ==========================================
// 职责: 逐字段处理一行原始数据
// 1. 非必填 + 空值 → 跳过（不进属性集，也不参与校验）
// 2. 执行创建前变换，变换结果为空时沿用原始值
// 3. 登记该字段的校验规则，供行校验使用
// 常量字段原样写入每一行，不参与校验
// ==========================================

use crate::domain::attributes::is_blank;
use crate::domain::field::FieldDescriptor;
use crate::domain::row::SheetRow;
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::import_builder::FieldMapping;
use serde_json::Value;
use std::collections::HashMap;

/// 单字段处理结果
#[derive(Debug, Clone, PartialEq)]
pub enum FieldOutcome {
    Value(Value),
    Skip,
}

/// 经字段管道处理后、待校验的一行
#[derive(Debug)]
pub struct PreparedRow<'a> {
    pub line: usize,
    /// 点路径 → 值（字段声明顺序）
    pub values: Vec<(String, Value)>,
    /// 参与本行校验的字段
    pub fields: Vec<&'a FieldDescriptor>,
}

/// 字段管道（每次导入构建一次）
#[derive(Debug)]
pub struct FieldPipeline<'a> {
    entries: Vec<(&'a FieldDescriptor, usize)>,
    constants: &'a [(String, Value)],
}

impl<'a> FieldPipeline<'a> {
    /// 将字段映射与字段描述对齐
    ///
    /// # 错误
    /// - MissingFieldDescriptor: 映射中的字段没有描述（配置错误）
    pub fn new(
        mapping: &'a FieldMapping,
        schemas: &'a HashMap<String, FieldDescriptor>,
    ) -> ImportResult<Self> {
        let entries = mapping
            .entries()
            .iter()
            .map(|(id, column)| {
                schemas
                    .get(id)
                    .map(|field| (field, *column))
                    .ok_or_else(|| ImportError::MissingFieldDescriptor(id.clone()))
            })
            .collect::<ImportResult<Vec<_>>>()?;

        Ok(Self {
            entries,
            constants: mapping.constants(),
        })
    }

    /// 处理单个字段
    pub fn apply(field: &FieldDescriptor, raw: &Value, row: &SheetRow) -> FieldOutcome {
        if !field.is_required() && is_blank(raw) {
            return FieldOutcome::Skip;
        }

        let value = match field.mutator() {
            Some(mutator) => match mutator(raw, row) {
                Some(mutated) if !is_blank(&mutated) => mutated,
                _ => raw.clone(),
            },
            None => raw.clone(),
        };

        FieldOutcome::Value(value)
    }

    /// 处理整行
    pub fn prepare(&self, row: &SheetRow) -> PreparedRow<'a> {
        let mut prepared = PreparedRow {
            line: row.line_number(),
            values: Vec::with_capacity(self.entries.len() + self.constants.len()),
            fields: Vec::with_capacity(self.entries.len()),
        };

        for (field, column) in &self.entries {
            if let FieldOutcome::Value(value) = Self::apply(field, row.get(*column), row) {
                prepared.values.push((field.id().to_string(), value));
                prepared.fields.push(*field);
            }
        }

        for (id, value) in self.constants {
            prepared.values.push((id.clone(), value.clone()));
        }

        prepared
    }
}
