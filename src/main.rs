// ==========================================
// 焊接生产分析看板 - 命令行入口
// ==========================================
// 用法:
//   weld-analytics [主数据文件] [缺陷数据文件] [--export 输出文件]
// 未提供路径时从配置库读取数据来源
// 输出: 看板摘要（JSON，stdout）
// ==========================================

use anyhow::{bail, Context};
use serde_json::json;
use std::path::PathBuf;
use weld_analytics::app::{get_default_db_path, AnalyticsSession};
use weld_analytics::config::{ConfigManager, DashboardConfigReader, DataSourceConfig};
use weld_analytics::export::{default_export_filename, export_records_to_path};
use weld_analytics::importer::{DataLoader, RecordNormalizer};
use weld_analytics::importer::field_mapper::ColumnSchema;
use weld_analytics::{logging, APP_NAME, VERSION};

const TOP_WELDERS: usize = 10;

struct CliArgs {
    paths: Vec<String>,
    export: Option<Option<PathBuf>>,
}

fn parse_args() -> CliArgs {
    let mut paths = Vec::new();
    let mut export = None;
    let mut args = std::env::args().skip(1).peekable();

    while let Some(arg) = args.next() {
        if arg == "--export" {
            let target = args
                .next_if(|next| !next.starts_with("--"))
                .map(PathBuf::from);
            export = Some(target);
        } else {
            paths.push(arg);
        }
    }

    CliArgs { paths, export }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init();

    tracing::info!("{} v{}", APP_NAME, VERSION);

    let args = parse_args();

    let db_path = get_default_db_path();
    tracing::info!("使用配置库: {}", db_path);
    let config = ConfigManager::new(&db_path).context("无法打开配置库")?;

    let source_config = match args.paths.as_slice() {
        [] => match config.get_data_source_config().await? {
            Some(saved) => saved,
            None => bail!("未提供数据文件，且配置库中没有数据来源"),
        },
        [main] => DataSourceConfig::new(main.clone(), None),
        [main, defects, ..] => DataSourceConfig::new(main.clone(), Some(defects.clone())),
    };
    source_config.validate()?;

    let rule = config.get_defect_rule().await?;
    let targets = config.get_kpi_targets().await?;
    let name_case = config.get_name_case().await?;

    let loader = DataLoader::new(RecordNormalizer::new(ColumnSchema::default(), name_case));
    let source = source_config.to_data_source();
    let session = AnalyticsSession::open(loader, &source, rule, targets).await?;

    if !args.paths.is_empty() {
        config.set_data_source_config(&source_config)?;
    }

    let snapshot = session.snapshot();
    let welders = session.welder_stats();
    let summary = json!({
        "loadId": snapshot.load_id,
        "source": snapshot.source,
        "records": session.records().len(),
        "defectRecords": session.defects().len(),
        "warnings": snapshot.warning_count(),
        "mode": session.mode().label(),
        "kpi": session.kpi_summary(),
        "defects": session.defect_summary(),
        "defectBreakdown": session.defect_breakdown(),
        "monthlyTrend": session.monthly_trend(),
        "topWelders": welders.top_n(TOP_WELDERS),
    });

    println!("{}", serde_json::to_string_pretty(&summary)?);

    if let Some(target) = args.export {
        let path = target.unwrap_or_else(|| {
            PathBuf::from(default_export_filename(chrono::Local::now().date_naive()))
        });
        export_records_to_path(session.records(), session.headers(), &path)?;
    }

    Ok(())
}
