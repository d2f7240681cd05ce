// ==========================================
// 焊接生产分析看板 - 领域模型层
// ==========================================
// 职责: 定义记录实体、值类型、统计结果
// 红线: 不含数据访问逻辑,不含引擎逻辑
// ==========================================

pub mod stats;
pub mod types;
pub mod weld;

// 重导出核心类型
pub use stats::{WelderStats, PENALTY_PER_DEFECT};
pub use types::{
    AggType, CellValue, DefectStage, KpiStatus, NameCase, Period, RuleOperator, TrendDirection,
    TrendUnit, WeldDate,
};
pub use weld::{
    component_key, DefectRecord, NormalizedDataset, RowWarning, WeldRecord, UNKNOWN_WELDER,
};
