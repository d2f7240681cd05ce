// ==========================================
// ConfigManager 集成测试
// ==========================================
// 测试目标: 看板配置的读写、默认值、快照恢复
// ==========================================

mod test_helpers;

use test_helpers::create_test_db;
use weld_analytics::config::{config_keys, ConfigManager, DashboardConfigReader, DataSourceConfig};
use weld_analytics::domain::types::NameCase;
use weld_analytics::engine::{DefectRule, KpiTargets};

#[tokio::test]
async fn test_config_manager_creation() {
    let (_temp_file, db_path) = create_test_db().expect("Failed to create test db");

    let config_manager = ConfigManager::new(&db_path);
    assert!(
        config_manager.is_ok(),
        "ConfigManager should be created successfully"
    );
}

#[tokio::test]
async fn test_defaults_when_empty() {
    let (_temp_file, db_path) = create_test_db().unwrap();
    let config = ConfigManager::new(&db_path).unwrap();

    assert_eq!(config.get_data_source_config().await.unwrap(), None);
    assert_eq!(config.get_defect_rule().await.unwrap(), DefectRule::default());
    assert_eq!(config.get_kpi_targets().await.unwrap(), KpiTargets::default());
    assert_eq!(config.get_name_case().await.unwrap(), NameCase::Upper);
}

#[tokio::test]
async fn test_settings_persist_across_instances() {
    let (_temp_file, db_path) = create_test_db().unwrap();

    {
        let config = ConfigManager::new(&db_path).unwrap();
        config
            .set_data_source_config(&DataSourceConfig::new(
                "main.xlsx",
                Some("defects.csv".to_string()),
            ))
            .unwrap();
        config
            .set_defect_rule(&DefectRule::parse("ИТОГО проволока", ">", "10").unwrap())
            .unwrap();
        config
            .set_kpi_targets(&KpiTargets {
                defect_rate: 3.0,
                avg_length_per_shift: 40.0,
                monthly_target: 1200.0,
            })
            .unwrap();
        config.set_name_case(NameCase::Title).unwrap();
    }

    let config = ConfigManager::new(&db_path).unwrap();

    let source = config.get_data_source_config().await.unwrap().unwrap();
    assert_eq!(source.main_path, "main.xlsx");
    assert_eq!(source.defect_path.as_deref(), Some("defects.csv"));

    let rule = config.get_defect_rule().await.unwrap();
    assert_eq!(rule.to_string(), "ИТОГО проволока > 10");

    assert_eq!(config.get_kpi_targets().await.unwrap().defect_rate, 3.0);
    assert_eq!(config.get_name_case().await.unwrap(), NameCase::Title);
}

#[tokio::test]
async fn test_clearing_defect_path() {
    let (_temp_file, db_path) = create_test_db().unwrap();
    let config = ConfigManager::new(&db_path).unwrap();

    config
        .set_data_source_config(&DataSourceConfig::new("a.csv", Some("b.csv".to_string())))
        .unwrap();
    config
        .set_data_source_config(&DataSourceConfig::new("a.csv", None))
        .unwrap();

    let source = config.get_data_source_config().await.unwrap().unwrap();
    assert_eq!(source.defect_path, None);
}

#[tokio::test]
async fn test_invalid_data_source_rejected() {
    let (_temp_file, db_path) = create_test_db().unwrap();
    let config = ConfigManager::new(&db_path).unwrap();

    assert!(config
        .set_data_source_config(&DataSourceConfig::new("main.pdf", None))
        .is_err());
    assert_eq!(
        config
            .get_global_config_value(config_keys::MAIN_SOURCE_PATH)
            .unwrap(),
        None
    );
}

#[tokio::test]
async fn test_snapshot_and_restore() {
    let (_temp_file, db_path) = create_test_db().unwrap();
    let config = ConfigManager::new(&db_path).unwrap();

    config
        .set_kpi_targets(&KpiTargets {
            defect_rate: 7.5,
            ..KpiTargets::default()
        })
        .unwrap();
    let snapshot = config.get_config_snapshot().unwrap();

    config.set_kpi_targets(&KpiTargets::default()).unwrap();
    assert_eq!(config.get_kpi_targets().await.unwrap().defect_rate, 5.0);

    let restored = config.restore_config_from_snapshot(&snapshot).unwrap();
    assert_eq!(restored, 1);
    assert_eq!(config.get_kpi_targets().await.unwrap().defect_rate, 7.5);
}
