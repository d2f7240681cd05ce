// ==========================================
// 焊接生产分析看板 - 引擎层
// ==========================================
// 职责: 基于不可变快照的纯函数计算（关联、筛选、聚合、趋势、分类）
// 红线: 引擎不持有全局状态，不做 I/O
// ==========================================

pub mod defect_classifier;
pub mod filter;
pub mod kpi_summary;
pub mod linkage;
pub mod trend;
pub mod welder_metrics;

// 重导出核心引擎
pub use defect_classifier::{
    classify_defects, rework_incidence, DefectBreakdown, DefectRule, LinkageMode, ReworkIncidence,
    RuleError, RuleValue, StageCount,
};
pub use filter::{filter, filter_defects, DateRange, FilterError, FilterSpec};
pub use kpi_summary::{
    defect_summary, kpi_summary, monthly_trend_card, DefectSummary, KpiSummary, KpiTargets,
    MonthlyTrendCard, TrendIndicator,
};
pub use linkage::{build_linkage_index, DefectLinkageIndex};
pub use trend::{
    compute_trend, half_split_trend, period_comparison, welder_series, HalfMetric,
    HalfSplitTrend, MetricField, PeriodComparison, TrendSeries, WelderSeries,
};
pub use welder_metrics::{
    compute_welder_stats, count_defects, cutting_coefficient, material_coefficient,
    weighted_length, welder_defect_shares, WelderDefectShare, WelderTable,
};
