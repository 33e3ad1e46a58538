// ==========================================
// 表格批量导入引擎 - 命令行入口
// ==========================================
// 用法:
//   sheet-import [--db app.db] --model users --file users.csv \
//       --field name=0 --field email=1 --required name \
//       --rules email=email --unique email --skip-header --constant source=cli
// 默认值: 读取同一数据库 config_kv 表，命令行参数优先
// 退出码: 0 成功 / 1 失败
// ==========================================

use anyhow::{anyhow, bail};
use clap::Parser;
use sheet_import::config::{ConfigManager, ImportConfigReader};
use sheet_import::domain::FieldDescriptor;
use sheet_import::importer::{
    DiskRegistry, FieldMapping, ImportBuilder, ImportExecutor, LocalDisk, TracingNotifier,
};
use sheet_import::repository::SqliteRecordStore;
use sheet_import::{db, i18n, logging};
use std::collections::HashMap;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "sheet-import")]
#[command(version, about = "将 CSV/Excel 表格事务化导入 SQLite 表", long_about = None)]
struct Cli {
    /// SQLite 数据库文件（默认: SHEET_IMPORT_DB_PATH 或用户数据目录）
    #[arg(long)]
    db: Option<String>,

    /// 目标表（记录类型）
    #[arg(long)]
    model: String,

    /// 文件引用（相对存储盘根目录或绝对路径）
    #[arg(long)]
    file: String,

    /// 本地存储盘根目录（默认当前目录）
    #[arg(long)]
    disk_root: Option<PathBuf>,

    /// 字段映射 id=列号（列号从 0 开始，可重复）
    #[arg(long = "field", value_parser = parse_field_column, required = true)]
    fields: Vec<(String, usize)>,

    /// 字段校验规则 id=rule|rule
    #[arg(long = "rules", value_parser = parse_key_value)]
    rules: Vec<(String, String)>,

    /// 常量字段 id=值，写入每一行（可重复）
    #[arg(long = "constant", value_parser = parse_key_value)]
    constants: Vec<(String, String)>,

    /// 必填字段（可重复）
    #[arg(long = "required")]
    required: Vec<String>,

    /// 唯一字段，已存在的行跳过
    #[arg(long)]
    unique: Option<String>,

    /// 跳过首行表头
    #[arg(long)]
    skip_header: bool,

    /// 过滤全空行
    #[arg(long)]
    handle_blank_rows: bool,

    /// 行数上限（0 表示不限）
    #[arg(long)]
    rows_limit: Option<usize>,

    /// 逐条 实例化 → 填充 → 保存（默认一步创建）
    #[arg(long)]
    fill_and_save: bool,

    /// 通知语言 (en / zh-CN)
    #[arg(long)]
    locale: Option<String>,

    /// JSON 格式日志
    #[arg(long)]
    json_logs: bool,
}

fn parse_field_column(raw: &str) -> Result<(String, usize), String> {
    let (id, column) = raw
        .split_once('=')
        .ok_or_else(|| format!("期望 id=列号，实际为: {}", raw))?;
    let column = column
        .trim()
        .parse::<usize>()
        .map_err(|e| format!("列号无效 ({}): {}", column, e))?;
    Ok((id.trim().to_string(), column))
}

fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    let (id, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("期望 id=值，实际为: {}", raw))?;
    Ok((id.trim().to_string(), value.trim().to_string()))
}

/// 由命令行参数组装字段描述
fn build_descriptors(cli: &Cli) -> anyhow::Result<Vec<FieldDescriptor>> {
    let mut rules: HashMap<&str, &str> = HashMap::new();
    for (id, expr) in &cli.rules {
        if !cli.fields.iter().any(|(field, _)| field == id) {
            bail!("--rules 引用了未映射的字段: {}", id);
        }
        rules.insert(id.as_str(), expr.as_str());
    }

    for id in &cli.required {
        if !cli.fields.iter().any(|(field, _)| field == id) {
            bail!("--required 引用了未映射的字段: {}", id);
        }
    }

    cli.fields
        .iter()
        .map(|(id, _)| -> anyhow::Result<FieldDescriptor> {
            let descriptor =
                FieldDescriptor::new(id.clone()).required(cli.required.contains(id));
            match rules.get(id.as_str()) {
                Some(expr) => Ok(descriptor.rules(expr)?),
                None => Ok(descriptor),
            }
        })
        .collect()
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    if cli.json_logs {
        logging::init_json();
    } else {
        logging::init();
    }

    if let Some(locale) = &cli.locale {
        i18n::set_locale(locale);
    }

    let db_path = cli.db.clone().unwrap_or_else(db::get_default_db_path);
    info!(version = sheet_import::VERSION, db = %db_path, model = %cli.model, "sheet-import 启动");

    // 配置层默认值
    let config_manager = ConfigManager::new(&db_path).map_err(|e| anyhow!(e))?;
    let defaults = config_manager.load_defaults().await.map_err(|e| anyhow!(e))?;
    info!(?defaults, "导入默认值已加载");

    let descriptors = build_descriptors(&cli)?;
    let mapping = cli
        .constants
        .iter()
        .fold(
            cli.fields.iter().cloned().collect::<FieldMapping>(),
            |mapping, (id, value)| mapping.constant(id.clone(), value.clone()),
        );

    let mut builder = ImportBuilder::make(cli.file.clone())
        .with_defaults(&defaults)
        .model(cli.model.clone())
        .fields(mapping)
        .form_schemas(descriptors);

    if cli.skip_header {
        builder = builder.skip_header(true);
    }
    if cli.handle_blank_rows {
        builder = builder.handle_blank_rows(true);
    }
    if cli.fill_and_save {
        builder = builder.mass_create(false);
    }
    if let Some(limit) = cli.rows_limit {
        builder = builder.rows_limit(Some(limit));
    }
    if let Some(unique) = &cli.unique {
        builder = builder.unique_field(unique.clone());
    }

    let store = SqliteRecordStore::new(&db_path)?;
    let disk_root = cli.disk_root.clone().unwrap_or_else(|| PathBuf::from("."));
    let disks = DiskRegistry::new().with_disk(defaults.disk.clone(), LocalDisk::new(disk_root));

    // 导入全程为同步阻塞 I/O
    let result = tokio::task::spawn_blocking(move || {
        let mut executor = ImportExecutor::new(store, TracingNotifier, disks);
        builder.execute(&mut executor)
    })
    .await?;

    println!("{}", serde_json::to_string_pretty(&result)?);

    Ok(if result.success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
