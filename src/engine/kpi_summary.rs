// ==========================================
// 焊接生产分析看板 - KPI 汇总
// ==========================================
// 职责: 筛选结果的总量指标 + 半分趋势 + 目标状态判定
//       缺陷汇总（前 3 名焊工）+ 月度趋势卡片
// ==========================================

use crate::domain::stats::{ratio_or_zero, round_to};
use crate::domain::types::{AggType, KpiStatus, Period, TrendDirection, TrendUnit, WeldDate};
use crate::domain::weld::WeldRecord;
use crate::engine::defect_classifier::LinkageMode;
use crate::engine::trend::{
    compute_trend, half_split_trend, period_comparison, HalfMetric, MetricField, PeriodComparison,
};
use crate::engine::welder_metrics::{compute_welder_stats, count_defects};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::instrument;

// ==========================================
// KPI 目标
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KpiTargets {
    pub defect_rate: f64,          // 缺陷率上限 (%)
    pub avg_length_per_shift: f64, // 每班焊缝长度下限 (米)
    pub monthly_target: f64,       // 月度焊缝长度目标 (米)
}

impl Default for KpiTargets {
    fn default() -> Self {
        Self {
            defect_rate: 5.0,
            avg_length_per_shift: 30.0,
            monthly_target: 900.0,
        }
    }
}

impl KpiTargets {
    /// 缺陷率: ≤ 目标 good，≤ 2×目标 warning，否则 bad
    pub fn defect_status(&self, defect_percent: f64) -> KpiStatus {
        if defect_percent <= self.defect_rate {
            KpiStatus::Good
        } else if defect_percent <= self.defect_rate * 2.0 {
            KpiStatus::Warning
        } else {
            KpiStatus::Bad
        }
    }

    /// 每班均值: ≥ 目标 good，否则 warning
    pub fn length_status(&self, avg_per_shift: f64) -> KpiStatus {
        if avg_per_shift >= self.avg_length_per_shift {
            KpiStatus::Good
        } else {
            KpiStatus::Warning
        }
    }
}

// ==========================================
// 趋势指示
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TrendIndicator {
    pub change: f64,
    pub unit: TrendUnit,
    pub direction: TrendDirection,
    pub improving: bool, // 缺陷率下降 / 其他指标上升
}

impl TrendIndicator {
    fn new(change: f64, unit: TrendUnit, lower_is_better: bool) -> Self {
        let direction = TrendDirection::of(change);
        let improving = match direction {
            TrendDirection::Up => !lower_is_better,
            TrendDirection::Down => lower_is_better,
            TrendDirection::Flat => false,
        };
        Self {
            change,
            unit,
            direction,
            improving,
        }
    }
}

// ==========================================
// KpiSummary
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KpiSummary {
    pub total_operations: usize,
    pub total_length: f64,
    pub total_wire: f64,
    pub unique_shift_dates: usize,
    pub avg_per_shift: f64, // 2 位小数
    pub defect_count: usize,
    pub defect_percent: f64, // 1 位小数，分母为作业次数
    pub defect_source: String,

    pub count_trend: TrendIndicator,
    pub length_trend: TrendIndicator,
    pub avg_trend: TrendIndicator,
    pub defect_trend: TrendIndicator, // 百分点

    pub defect_status: KpiStatus,
    pub length_status: KpiStatus,
}

/// 计算 KPI 汇总
#[instrument(skip(records, mode, targets), fields(count = records.len()))]
pub fn kpi_summary(records: &[WeldRecord], mode: &LinkageMode, targets: &KpiTargets) -> KpiSummary {
    let total = records.len();
    let total_length: f64 = records.iter().map(|r| r.weld_length_m).sum();
    let total_wire: f64 = records.iter().map(|r| r.wire_total).sum();
    let shifts: HashSet<WeldDate> = records.iter().filter_map(|r| r.date).collect();
    let avg_per_shift = round_to(ratio_or_zero(total_length, shifts.len() as f64), 2);

    let defect_count = count_defects(records, mode);
    let defect_percent = round_to(ratio_or_zero(defect_count as f64, total as f64) * 100.0, 1);

    let trend = |metric: HalfMetric, lower_is_better: bool| {
        let t = half_split_trend(records, metric, mode);
        TrendIndicator::new(t.change, t.unit, lower_is_better)
    };

    KpiSummary {
        total_operations: total,
        total_length,
        total_wire,
        unique_shift_dates: shifts.len(),
        avg_per_shift,
        defect_count,
        defect_percent,
        defect_source: mode.label(),
        count_trend: trend(HalfMetric::Count, false),
        length_trend: trend(HalfMetric::SumLength, false),
        avg_trend: trend(HalfMetric::AvgPerShift, false),
        defect_trend: trend(HalfMetric::DefectPercent, true),
        defect_status: targets.defect_status(defect_percent),
        length_status: targets.length_status(avg_per_shift),
    }
}

// ==========================================
// DefectSummary
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DefectSummary {
    pub defect_count: usize, // 各焊工去重缺陷之和
    pub defect_percent: f64,
    pub top_welders: Vec<(String, usize)>,
    pub source: String,
    pub within_target: bool,
}

const TOP_DEFECT_WELDERS: usize = 3;

pub fn defect_summary(
    records: &[WeldRecord],
    mode: &LinkageMode,
    targets: &KpiTargets,
) -> DefectSummary {
    let table = compute_welder_stats(records, mode);
    let defect_count = table.total_defects();
    let defect_percent = round_to(
        ratio_or_zero(defect_count as f64, records.len() as f64) * 100.0,
        1,
    );

    DefectSummary {
        defect_count,
        defect_percent,
        top_welders: table.top_defect_welders(TOP_DEFECT_WELDERS),
        source: mode.label(),
        within_target: defect_percent <= targets.defect_rate,
    }
}

// ==========================================
// 月度趋势卡片
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyTrendCard {
    pub comparison: PeriodComparison,
    pub target: f64,
    pub target_met: bool,
    pub total: f64,
    pub month_count: usize,
}

/// 月度焊缝长度趋势；少于 2 个月返回 None
pub fn monthly_trend_card(records: &[WeldRecord], targets: &KpiTargets) -> Option<MonthlyTrendCard> {
    let series = compute_trend(records, &MetricField::WeldLength, Period::Month, AggType::Sum);
    let comparison = period_comparison(&series)?;

    Some(MonthlyTrendCard {
        target: targets.monthly_target,
        target_met: comparison.current >= targets.monthly_target,
        total: series.total(),
        month_count: series.len(),
        comparison,
    })
}
