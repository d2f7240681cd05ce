// ==========================================
// 焊接生产分析看板 - 核心库
// ==========================================
// 技术栈: Rust + SQLite（配置）+ CSV/Excel（数据来源）
// 系统定位: 指标推导引擎（展示层不在本库内）
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 记录与值类型
pub mod domain;

// 导入层 - 外部数据与归一化
pub mod importer;

// 引擎层 - 指标推导
pub mod engine;

// 配置层 - 看板配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一）
pub mod db;

// 日志系统
pub mod logging;

// 应用层 - 分析会话
pub mod app;

// 导出
pub mod export;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{AggType, CellValue, NameCase, Period, RuleOperator, WeldDate};

// 领域实体
pub use domain::{DefectRecord, WeldRecord, WelderStats};

// 引擎
pub use engine::{
    DefectLinkageIndex, DefectRule, FilterSpec, KpiTargets, LinkageMode, MetricField,
    WelderTable,
};

// 导入
pub use importer::{DataLoader, DataSnapshot, DataSource, FileDataSource, ImportError};

// 会话
pub use app::{AnalyticsSession, SessionError};

// 配置
pub use config::{ConfigManager, DashboardConfigReader, DataSourceConfig};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "焊接生产分析看板";
