// ==========================================
// 表格批量导入引擎 - 导入执行器
// ==========================================
// 职责: 在单个事务内逐行执行 字段管道 → 校验 → 创建前变换 → 去重 → 创建 → 创建后钩子
// 状态: Running → Committed(成功) | RolledBack(失败)
// 红线:
// - 任一行校验失败 / 唯一字段缺值 → 整体回滚，不再处理后续行
// - execute() 从不向调用方返回错误，一切结果经回调 + 通知 + ExecutionResult 体现
// ==========================================

use crate::domain::row::SheetRow;
use crate::i18n::{t, t_with_args};
use crate::importer::disk::DiskRegistry;
use crate::importer::duplication_guard::{DuplicationGuard, UniqueCheck};
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::field_pipeline::FieldPipeline;
use crate::importer::import_builder::{CompletionCallback, ImportBuilder, ImportConfig};
use crate::importer::notifier::{Notification, Notifier};
use crate::importer::row_source::RowSource;
use crate::importer::row_validator::{RowValidator, ValidationOutcome};
use crate::repository::record_store::{RecordStore, TransactionOutcome};
use serde::Serialize;
use std::time::Instant;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

/// 一次导入的结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExecutionResult {
    pub batch_id: String,
    pub success: bool,
    /// 加载到的数据行数（表头/空行已剔除）
    pub total_rows: usize,
    /// 已提交的新建记录数（回滚时为 0）
    pub created_count: usize,
    pub skipped_count: usize,
    /// 导致回滚的行号
    pub failed_line: Option<usize>,
    pub message: Option<String>,
}

/// 事务体的结束状态
#[derive(Debug)]
enum RowsOutcome {
    Committed {
        created: usize,
        skipped: usize,
    },
    RolledBack {
        line: usize,
        message: String,
        skipped: usize,
    },
}

// ==========================================
// ImportExecutor
// ==========================================
pub struct ImportExecutor<S, N>
where
    S: RecordStore,
    N: Notifier,
{
    store: S,
    notifier: N,
    disks: DiskRegistry,
}

impl<S, N> ImportExecutor<S, N>
where
    S: RecordStore,
    N: Notifier,
{
    /// 创建执行器
    ///
    /// # 参数
    /// - store: 目标记录仓储（提供事务）
    /// - notifier: 通知出口
    /// - disks: 存储盘注册表
    pub fn new(store: S, notifier: N, disks: DiskRegistry) -> Self {
        Self {
            store,
            notifier,
            disks,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// 构建配置并执行；配置错误按异常路径处理
    pub fn execute_builder(&mut self, builder: ImportBuilder) -> ExecutionResult {
        match builder.into_config() {
            Ok(config) => self.execute(config),
            Err((err, on_fail)) => {
                let batch_id = Uuid::new_v4().to_string();
                self.finish_with_error(batch_id, 0, err, on_fail)
            }
        }
    }

    /// 执行导入
    ///
    /// # 流程
    /// 1. 加载行（读取/上限错误 → 异常路径）
    /// 2. 单事务逐行处理
    /// 3. 提交 → 成功回调 + 成功通知
    /// 4. 回滚 → 失败回调 + 失败通知
    /// 5. 任意错误 → 失败回调 + "导入文件出错" 通知（原始错误信息）
    #[instrument(
        skip(self, config),
        fields(batch_id, model = %config.model, source = %config.source)
    )]
    pub fn execute(&mut self, mut config: ImportConfig) -> ExecutionResult {
        let start_time = Instant::now();
        let batch_id = Uuid::new_v4().to_string();
        tracing::Span::current().record("batch_id", batch_id.as_str());
        info!(batch_id = %batch_id, disk = %config.disk, "开始导入");

        let on_success = config.on_success.take();
        let on_fail = config.on_fail.take();

        let rows = match self.load_rows(&config) {
            Ok(rows) => rows,
            Err(err) => return self.finish_with_error(batch_id, 0, err, on_fail),
        };
        let total_rows = rows.len();
        info!(total_rows = total_rows, "行加载完成");

        let outcome = match self.process(&config, &rows) {
            Ok(outcome) => outcome,
            Err(err) => return self.finish_with_error(batch_id, total_rows, err, on_fail),
        };

        match outcome {
            RowsOutcome::Committed { created, skipped } => {
                info!(
                    batch_id = %batch_id,
                    created = created,
                    skipped = skipped,
                    elapsed_ms = start_time.elapsed().as_millis() as u64,
                    "导入完成，事务已提交"
                );

                let result = ExecutionResult {
                    batch_id,
                    success: true,
                    total_rows,
                    created_count: created,
                    skipped_count: skipped,
                    failed_line: None,
                    message: None,
                };

                if let Some(callback) = on_success {
                    callback(&result);
                }

                self.notifier.notify(Notification::success(
                    t("import.import_succeeded_title"),
                    t_with_args(
                        "import.import_succeeded",
                        &[
                            ("count", &created.to_string()),
                            ("skipped", &skipped.to_string()),
                        ],
                    ),
                ));

                result
            }
            RowsOutcome::RolledBack {
                line,
                message,
                skipped,
            } => {
                warn!(
                    batch_id = %batch_id,
                    line = line,
                    error = %message,
                    "导入失败，事务已回滚"
                );

                let result = ExecutionResult {
                    batch_id,
                    success: false,
                    total_rows,
                    created_count: 0,
                    skipped_count: skipped,
                    failed_line: Some(line),
                    message: Some(message),
                };

                if let Some(callback) = on_fail {
                    callback(&result);
                }

                self.notifier.notify(Notification::danger(
                    t("import.import_failed_title"),
                    t("import.import_failed"),
                ));

                result
            }
        }
    }

    fn load_rows(&self, config: &ImportConfig) -> ImportResult<Vec<SheetRow>> {
        let disk = self.disks.get(&config.disk)?;
        RowSource::new(
            config.skip_header,
            config.handle_blank_rows,
            config.rows_limit,
        )
        .load(disk, &config.source)
    }

    /// 单事务处理全部行
    fn process(&mut self, config: &ImportConfig, rows: &[SheetRow]) -> ImportResult<RowsOutcome> {
        let pipeline = FieldPipeline::new(&config.mapping, &config.schemas)?;
        let guard = config
            .unique_field
            .as_deref()
            .map(|field| DuplicationGuard::new(&config.model, field));

        let Self {
            store, notifier, ..
        } = self;
        let validator = RowValidator::new(&*notifier);

        store.transaction::<_, ImportError, _>(|tx| {
            let mut created = 0usize;
            let mut skipped = 0usize;

            for row in rows {
                let line = row.line_number();

                let attributes = match validator.validate(pipeline.prepare(row))? {
                    ValidationOutcome::Passed(attributes) => attributes,
                    ValidationOutcome::Failed { line, message } => {
                        return Ok(TransactionOutcome::Rollback(RowsOutcome::RolledBack {
                            line,
                            message,
                            skipped,
                        }));
                    }
                };

                let attributes = match &config.before_create {
                    Some(hook) => hook(attributes),
                    None => attributes,
                };

                if let Some(guard) = &guard {
                    match guard.check(&mut *tx, &attributes)? {
                        UniqueCheck::Fresh => {}
                        UniqueCheck::Duplicate(existing) => {
                            debug!(line = line, existing_id = ?existing.id, "记录已存在，跳过");
                            skipped += 1;
                            continue;
                        }
                        UniqueCheck::MissingValue => {
                            warn!(line = line, field = %guard.unique_field(), "唯一字段缺少取值");
                            return Ok(TransactionOutcome::Rollback(RowsOutcome::RolledBack {
                                line,
                                message: format!(
                                    "唯一字段 {} 缺少取值",
                                    guard.unique_field()
                                ),
                                skipped,
                            }));
                        }
                    }
                }

                let record = match &config.creation_override {
                    Some(create) => create(&mut *tx, &attributes)?,
                    None if config.mass_create => tx.create(&config.model, &attributes)?,
                    None => tx.fill_and_save(&config.model, &attributes)?,
                };
                created += 1;
                debug!(line = line, record_id = ?record.id, "记录已创建");

                if let Some(hook) = &config.after_create {
                    hook(&mut *tx, &record, &attributes)?;
                }
            }

            Ok(TransactionOutcome::Commit(RowsOutcome::Committed { created, skipped }))
        })
    }

    /// 异常路径: 失败回调 + 非持久 danger 通知（原始错误信息）
    fn finish_with_error(
        &self,
        batch_id: String,
        total_rows: usize,
        err: ImportError,
        on_fail: Option<CompletionCallback>,
    ) -> ExecutionResult {
        error!(batch_id = %batch_id, error = %err, "导入文件出错");

        let message = err.to_string();
        let result = ExecutionResult {
            batch_id,
            success: false,
            total_rows,
            created_count: 0,
            skipped_count: 0,
            failed_line: None,
            message: Some(message.clone()),
        };

        if let Some(callback) = on_fail {
            callback(&result);
        }

        self.notifier.notify(
            Notification::danger(t("import.error_importing_file"), message).persistent(false),
        );

        result
    }
}
