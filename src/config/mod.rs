// ==========================================
// 焊接生产分析看板 - 配置层
// ==========================================
// 职责: 看板配置管理（数据来源、缺陷规则、KPI 目标）
// 存储: config_kv 表
// ==========================================

pub mod config_manager;
pub mod config_reader_trait;
pub mod dashboard_config;

// 重导出核心配置管理器
pub use config_manager::{config_keys, ConfigError, ConfigManager, ConfigResult};
pub use config_reader_trait::DashboardConfigReader;
pub use dashboard_config::DataSourceConfig;
