// ==========================================
// 焊接生产分析看板 - 趋势计算器
// ==========================================
// 两种独立机制:
// 1. 半分趋势: 按加载顺序在 floor(n/2) 处切分，比较前后两半
// 2. 周期分桶: 日/月/季/年分桶 → 聚合 → 字典序排序 → 环比与滚动 3 期对比
// 红线: 空桶不补零；少于 2 个桶 → 趋势不可用（None），不是 0
// ==========================================

use crate::domain::stats::{ratio_or_zero, round_to};
use crate::domain::types::{AggType, Period, TrendUnit, WeldDate};
use crate::domain::weld::WeldRecord;
use crate::engine::defect_classifier::LinkageMode;
use crate::engine::welder_metrics::{count_defects, weighted_length};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use tracing::instrument;

// ==========================================
// 取值字段
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MetricField {
    WeldLength,
    WireTotal,
    WeightedLength,
    /// 按表头名取列值（宽松解析，缺失为 0）
    Column(String),
}

impl MetricField {
    pub fn value(&self, record: &WeldRecord) -> f64 {
        match self {
            MetricField::WeldLength => record.weld_length_m,
            MetricField::WireTotal => record.wire_total,
            MetricField::WeightedLength => weighted_length(record),
            MetricField::Column(name) => record.cell(name).map(|c| c.lenient_f64()).unwrap_or(0.0),
        }
    }
}

// ==========================================
// 半分趋势
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HalfMetric {
    SumLength,
    Count,
    DefectPercent,
    AvgPerShift,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HalfSplitTrend {
    pub first_half: f64,
    pub second_half: f64,
    pub change: f64, // 1 位小数
    pub unit: TrendUnit,
}

fn half_value(half: &[WeldRecord], metric: HalfMetric, mode: &LinkageMode) -> f64 {
    match metric {
        HalfMetric::SumLength => half.iter().map(|r| r.weld_length_m).sum(),
        HalfMetric::Count => half.len() as f64,
        HalfMetric::DefectPercent => {
            ratio_or_zero(count_defects(half, mode) as f64, half.len() as f64) * 100.0
        }
        HalfMetric::AvgPerShift => {
            let length: f64 = half.iter().map(|r| r.weld_length_m).sum();
            let shifts: HashSet<WeldDate> = half.iter().filter_map(|r| r.date).collect();
            ratio_or_zero(length, shifts.len() as f64)
        }
    }
}

/// 半分趋势
///
/// - 缺陷率: 百分点差（后半 - 前半）
/// - 其他: 相对百分比，前半为 0 时返回 0
pub fn half_split_trend(
    records: &[WeldRecord],
    metric: HalfMetric,
    mode: &LinkageMode,
) -> HalfSplitTrend {
    let (first, second) = records.split_at(records.len() / 2);
    let first_half = half_value(first, metric, mode);
    let second_half = half_value(second, metric, mode);

    let (change, unit) = match metric {
        HalfMetric::DefectPercent => (second_half - first_half, TrendUnit::PercentagePoints),
        _ if first_half > 0.0 => (
            (second_half - first_half) / first_half * 100.0,
            TrendUnit::Percent,
        ),
        _ => (0.0, TrendUnit::Percent),
    };

    HalfSplitTrend {
        first_half,
        second_half,
        change: round_to(change, 1),
        unit,
    }
}

// ==========================================
// 周期分桶
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TrendSeries {
    pub labels: Vec<String>,
    pub values: Vec<f64>,
}

impl TrendSeries {
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn total(&self) -> f64 {
        self.values.iter().sum()
    }
}

fn aggregate(values: &[f64], agg: AggType) -> f64 {
    match agg {
        AggType::Sum => values.iter().sum(),
        AggType::Avg => ratio_or_zero(values.iter().sum(), values.len() as f64),
        AggType::Count => values.len() as f64,
    }
}

/// 按周期分桶聚合（无日期的作业不参与）
#[instrument(skip(records, field), fields(count = records.len()))]
pub fn compute_trend(
    records: &[WeldRecord],
    field: &MetricField,
    period: Period,
    agg: AggType,
) -> TrendSeries {
    let mut buckets: BTreeMap<String, Vec<f64>> = BTreeMap::new();
    for record in records {
        if let Some(date) = record.date {
            buckets
                .entry(date.bucket_key(period))
                .or_default()
                .push(field.value(record));
        }
    }

    let (labels, values) = buckets
        .into_iter()
        .map(|(key, vals)| (key, aggregate(&vals, agg)))
        .unzip();

    TrendSeries { labels, values }
}

// ==========================================
// 环比 / 滚动 3 期对比
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PeriodComparison {
    pub current: f64,
    pub previous: f64,
    pub change_percent: f64, // 当前 vs 上一期
    pub rolling_mean: f64,   // 最近 3 期均值
    pub prior_rolling_mean: f64,
    pub rolling_change_percent: f64, // 最近 3 期 vs 再往前 3 期
}

fn mean(values: &[f64]) -> f64 {
    ratio_or_zero(values.iter().sum(), values.len() as f64)
}

fn relative_change(current: f64, previous: f64) -> f64 {
    if previous > 0.0 {
        round_to((current - previous) / previous * 100.0, 1)
    } else {
        0.0
    }
}

/// 末期对比；少于 2 个桶返回 None
pub fn period_comparison(series: &TrendSeries) -> Option<PeriodComparison> {
    let values = &series.values;
    let n = values.len();
    if n < 2 {
        return None;
    }

    let current = values[n - 1];
    let previous = values[n - 2];
    let last3 = &values[n.saturating_sub(3)..];
    let prior3 = &values[n.saturating_sub(6)..n.saturating_sub(3)];
    let rolling_mean = mean(last3);
    let prior_rolling_mean = mean(prior3);

    Some(PeriodComparison {
        current,
        previous,
        change_percent: relative_change(current, previous),
        rolling_mean,
        prior_rolling_mean,
        rolling_change_percent: relative_change(rolling_mean, prior_rolling_mean),
    })
}

// ==========================================
// 焊工分周期序列
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct WelderSeries {
    pub labels: Vec<String>,
    pub series: Vec<(String, Vec<f64>)>, // 焊工 → 各周期焊缝长度（缺期补 0）
}

/// 每个焊工按周期的焊缝长度（焊工按首次出现顺序）
pub fn welder_series(records: &[WeldRecord], period: Period) -> WelderSeries {
    let mut order: Vec<String> = Vec::new();
    let mut per_welder: HashMap<String, HashMap<String, f64>> = HashMap::new();
    let mut periods: BTreeSet<String> = BTreeSet::new();

    for record in records {
        let welder = &record.welder_normalized;
        let buckets = per_welder.entry(welder.clone()).or_insert_with(|| {
            order.push(welder.clone());
            HashMap::new()
        });

        if let Some(date) = record.date {
            let key = date.bucket_key(period);
            *buckets.entry(key.clone()).or_insert(0.0) += record.weld_length_m;
            periods.insert(key);
        }
    }

    let labels: Vec<String> = periods.into_iter().collect();
    let series = order
        .into_iter()
        .map(|welder| {
            let values = labels
                .iter()
                .map(|p| {
                    per_welder
                        .get(&welder)
                        .and_then(|b| b.get(p))
                        .copied()
                        .unwrap_or(0.0)
                })
                .collect();
            (welder, values)
        })
        .collect();

    WelderSeries { labels, series }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::defect_classifier::DefectRule;
    use std::collections::HashMap as Map;

    fn record(welder: &str, date: &str, length: f64) -> WeldRecord {
        WeldRecord {
            row_number: 2,
            date: WeldDate::parse(date),
            order_id: None,
            component_id: None,
            welder_name: None,
            welder_normalized: welder.to_string(),
            weld_length_m: length,
            wire_total: 1.0,
            diameter: None,
            thickness: None,
            cutting_type: None,
            wire_material: None,
            cells: Map::new(),
        }
    }

    fn rule_mode() -> LinkageMode {
        LinkageMode::RuleBased(DefectRule::default())
    }

    #[test]
    fn test_half_split_relative_change() {
        let records = vec![
            record("A", "01.01.2024", 10.0),
            record("A", "02.01.2024", 10.0),
            record("A", "03.01.2024", 15.0),
            record("A", "04.01.2024", 15.0),
        ];

        let trend = half_split_trend(&records, HalfMetric::SumLength, &rule_mode());

        assert_eq!(trend.first_half, 20.0);
        assert_eq!(trend.second_half, 30.0);
        assert_eq!(trend.change, 50.0);
        assert_eq!(trend.unit, TrendUnit::Percent);
    }

    #[test]
    fn test_half_split_odd_length_puts_extra_in_second_half() {
        let records = vec![
            record("A", "", 1.0),
            record("A", "", 1.0),
            record("A", "", 1.0),
        ];
        let trend = half_split_trend(&records, HalfMetric::Count, &rule_mode());
        assert_eq!(trend.first_half, 1.0);
        assert_eq!(trend.second_half, 2.0);
        assert_eq!(trend.change, 100.0);
    }

    #[test]
    fn test_half_split_guard_on_zero_first_half() {
        let records = vec![record("A", "", 0.0), record("A", "", 5.0)];
        let trend = half_split_trend(&records, HalfMetric::SumLength, &rule_mode());
        assert_eq!(trend.change, 0.0);

        let trend = half_split_trend(&[], HalfMetric::AvgPerShift, &rule_mode());
        assert_eq!(trend.change, 0.0);
    }

    #[test]
    fn test_half_split_defect_percentage_points() {
        let mut defective = record("A", "", 1.0);
        defective
            .cells
            .insert("ИТОГО проволока".to_string(), crate::domain::types::CellValue::Float(0.0));
        let records = vec![
            record("A", "", 1.0),
            record("A", "", 1.0),
            defective,
            record("A", "", 1.0),
        ];

        let trend = half_split_trend(&records, HalfMetric::DefectPercent, &rule_mode());

        assert_eq!(trend.first_half, 0.0);
        assert_eq!(trend.second_half, 50.0);
        assert_eq!(trend.change, 50.0);
        assert_eq!(trend.unit, TrendUnit::PercentagePoints);
    }

    #[test]
    fn test_compute_trend_sorted_buckets_and_aggregates() {
        let records = vec![
            record("A", "10.11.2024", 1.0),
            record("A", "10.02.2024", 2.0),
            record("A", "10.09.2024", 3.0),
            record("A", "20.02.2024", 4.0),
            record("A", "", 100.0),
        ];

        let sum = compute_trend(&records, &MetricField::WeldLength, Period::Month, AggType::Sum);
        assert_eq!(sum.labels, vec!["2024-02", "2024-09", "2024-11"]);
        assert_eq!(sum.values, vec![6.0, 3.0, 1.0]);

        let avg = compute_trend(&records, &MetricField::WeldLength, Period::Month, AggType::Avg);
        assert_eq!(avg.values[0], 3.0);

        let count = compute_trend(&records, &MetricField::WeldLength, Period::Quarter, AggType::Count);
        assert_eq!(count.labels, vec!["2024-Q1", "2024-Q3", "2024-Q4"]);
        assert_eq!(count.values, vec![2.0, 1.0, 1.0]);
    }

    #[test]
    fn test_period_comparison() {
        let series = TrendSeries {
            labels: vec!["2024-01".into(), "2024-02".into(), "2024-03".into(), "2024-04".into()],
            values: vec![100.0, 120.0, 90.0, 150.0],
        };

        let cmp = period_comparison(&series).unwrap();

        assert_eq!(cmp.change_percent, 66.7);
        assert_eq!(cmp.rolling_mean, 120.0);
        assert_eq!(cmp.prior_rolling_mean, 100.0);
        assert_eq!(cmp.rolling_change_percent, 20.0);
    }

    #[test]
    fn test_period_comparison_unavailable() {
        let series = TrendSeries {
            labels: vec!["2024-01".into()],
            values: vec![100.0],
        };
        assert_eq!(period_comparison(&series), None);
        assert_eq!(period_comparison(&TrendSeries::default()), None);
    }

    #[test]
    fn test_welder_series_zero_filled() {
        let records = vec![
            record("IVANOV", "10.01.2024", 2.0),
            record("PETROV", "10.02.2024", 3.0),
            record("IVANOV", "12.01.2024", 1.0),
        ];

        let result = welder_series(&records, Period::Month);

        assert_eq!(result.labels, vec!["2024-01", "2024-02"]);
        assert_eq!(result.series[0], ("IVANOV".to_string(), vec![3.0, 0.0]));
        assert_eq!(result.series[1], ("PETROV".to_string(), vec![0.0, 3.0]));
    }
}
