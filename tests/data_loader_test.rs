// ==========================================
// 数据加载集成测试
// ==========================================
// 测试目标: 文件来源、缺陷来源降级、重载保留旧快照
// ==========================================

mod test_helpers;

use std::path::PathBuf;
use test_helpers::{csv_text, defect_row, main_row, write_temp_csv, DEFECT_HEADER, MAIN_HEADER, PRIMARY_REJECTION};
use weld_analytics::engine::{DefectRule, KpiTargets};
use weld_analytics::importer::{DataLoader, FileDataSource, ImportError};
use weld_analytics::{AnalyticsSession, SessionError};

fn main_csv() -> String {
    csv_text(
        MAIN_HEADER,
        &[
            main_row("10.01.2024", "З-1", "1", "Иванов", 2000, 0.0, "А", "08Г2С"),
            main_row("99.01.2024", "З-1", "2", "Иванов", 2000, 0.0, "А", "08Г2С"),
            main_row("11.01.2024", "З-1", "3", "Петров", 2000, 0.0, "Б", "08Г2С"),
        ],
    )
}

fn defect_csv() -> String {
    csv_text(
        DEFECT_HEADER,
        &[defect_row("З-1", "1", PRIMARY_REJECTION, "12.01.2024")],
    )
}

#[tokio::test]
async fn test_load_from_files() {
    let main = write_temp_csv(&main_csv()).unwrap();
    let defects = write_temp_csv(&defect_csv()).unwrap();

    let source = FileDataSource::new(main.path().to_path_buf(), Some(defects.path().to_path_buf()));
    let snapshot = DataLoader::default().load(&source).await.unwrap();

    assert_eq!(snapshot.weld.len(), 2);
    assert_eq!(snapshot.defect_records().len(), 1);
    assert!(snapshot.has_defect_data());
    assert_eq!(snapshot.warning_count(), 1);
}

#[tokio::test]
async fn test_missing_main_file_is_fatal() {
    let source = FileDataSource::new(PathBuf::from("/nonexistent/main.csv"), None);
    let result = DataLoader::default().load(&source).await;

    assert!(matches!(result, Err(ImportError::FileNotFound(_))));
}

#[tokio::test]
async fn test_missing_defect_file_degrades_to_rule_mode() {
    let main = write_temp_csv(&main_csv()).unwrap();
    let source = FileDataSource::new(
        main.path().to_path_buf(),
        Some(PathBuf::from("/nonexistent/defects.csv")),
    );

    let session = AnalyticsSession::open(
        DataLoader::default(),
        &source,
        DefectRule::default(),
        KpiTargets::default(),
    )
    .await
    .unwrap();

    assert!(!session.snapshot().has_defect_data());
    assert!(!session.mode().is_real_data());
    // 默认规则: ИТОГО проволока = 0
    assert_eq!(session.kpi_summary().defect_count, 2);
}

#[tokio::test]
async fn test_reload_replaces_snapshot_and_keeps_it_on_failure() {
    let main = write_temp_csv(&main_csv()).unwrap();
    let defects = write_temp_csv(&defect_csv()).unwrap();
    let source = FileDataSource::new(main.path().to_path_buf(), Some(defects.path().to_path_buf()));

    let mut session = AnalyticsSession::open(
        DataLoader::default(),
        &source,
        DefectRule::default(),
        KpiTargets::default(),
    )
    .await
    .unwrap();
    let first = session.snapshot().load_id;

    let missing = FileDataSource::new(PathBuf::from("/nonexistent/main.csv"), None);
    let err = session.reload(&missing).await;
    assert!(matches!(err, Err(SessionError::Load(ImportError::FileNotFound(_)))));
    assert_eq!(session.snapshot().load_id, first);
    assert_eq!(session.records().len(), 2);

    session.reload(&source).await.unwrap();
    assert_ne!(session.snapshot().load_id, first);
    assert!(session.mode().is_real_data());
}
