// ==========================================
// 焊接生产分析看板 - 焊工指标聚合器
// ==========================================
// 职责: 按归一化焊工姓名分组，计算加权长度、缺陷数、每班均值、综合得分
// 输入: 筛选后的焊接作业 + 缺陷判定模式
// 输出: WelderTable（按首次出现顺序）
// ==========================================
// 得分 = 加权长度 - 缺陷数 × 10
// 加权长度 = Σ 长度 × 下料系数 × 材料系数
// ==========================================

use crate::domain::stats::{ratio_or_zero, round_to, WelderStats, PENALTY_PER_DEFECT};
use crate::domain::types::WeldDate;
use crate::domain::weld::WeldRecord;
use crate::engine::defect_classifier::LinkageMode;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use tracing::{debug, instrument};

// ==========================================
// 系数表
// ==========================================

/// 下料方式首字母 → 复杂度系数
const CUTTING_COEFFICIENTS: [(char, f64); 6] = [
    ('А', 2.0),
    ('Б', 2.0),
    ('В', 3.0),
    ('Г', 4.0),
    ('Д', 5.0),
    ('Е', 4.5),
];

/// 碳钢焊丝牌号（包含匹配）
const CARBON_WIRES: [&str; 3] = ["08Г2С", "10НМА", "08ГА"];

const DEFAULT_CUTTING_COEFFICIENT: f64 = 1.0;
const CARBON_COEFFICIENT: f64 = 1.0;
const STAINLESS_COEFFICIENT: f64 = 1.2;

/// 下料复杂度系数（未登记或为空 → 1）
pub fn cutting_coefficient(cutting_type: Option<&str>) -> f64 {
    cutting_type
        .and_then(|c| c.trim().chars().next())
        .and_then(|first| {
            let upper = first.to_uppercase().next().unwrap_or(first);
            CUTTING_COEFFICIENTS
                .iter()
                .find(|(letter, _)| *letter == upper)
                .map(|(_, coefficient)| *coefficient)
        })
        .unwrap_or(DEFAULT_CUTTING_COEFFICIENT)
}

/// 材料系数：碳钢焊丝 1.0，其他（含缺失）按不锈钢 1.2
pub fn material_coefficient(wire_material: Option<&str>) -> f64 {
    match wire_material {
        Some(wire) if CARBON_WIRES.iter().any(|code| wire.contains(code)) => CARBON_COEFFICIENT,
        _ => STAINLESS_COEFFICIENT,
    }
}

/// 单条作业的加权长度
pub fn weighted_length(record: &WeldRecord) -> f64 {
    record.weld_length_m
        * cutting_coefficient(record.cutting_type.as_deref())
        * material_coefficient(record.wire_material.as_deref())
}

// ==========================================
// 缺陷计数
// ==========================================

/// 一组作业的缺陷数
///
/// - 真实数据: 判废索引中出现的去重组合键数（同一封头只计一次）
/// - 规则: 命中规则的作业数
pub fn count_defects(records: &[WeldRecord], mode: &LinkageMode) -> usize {
    match mode {
        LinkageMode::RealData(index) => records
            .iter()
            .filter_map(WeldRecord::component_key)
            .filter(|key| index.contains_rejection(key))
            .collect::<HashSet<_>>()
            .len(),
        LinkageMode::RuleBased(rule) => records.iter().filter(|r| rule.matches(r)).count(),
    }
}

// ==========================================
// 累加器
// ==========================================
struct Accumulator {
    stats: WelderStats,
    components: HashSet<String>,
    shift_dates: HashSet<WeldDate>,
    defective_keys: HashSet<String>,
    rule_hits: usize,
}

impl Accumulator {
    fn new(welder: &str) -> Self {
        Self {
            stats: WelderStats::empty(welder),
            components: HashSet::new(),
            shift_dates: HashSet::new(),
            defective_keys: HashSet::new(),
            rule_hits: 0,
        }
    }

    fn add(&mut self, record: &WeldRecord, mode: &LinkageMode) {
        self.stats.total += 1;
        self.stats.total_length += record.weld_length_m;
        self.stats.weighted_total += weighted_length(record);

        if let Some(component) = record.component_id.as_deref().map(str::trim) {
            if !component.is_empty() {
                self.components.insert(component.to_string());
            }
        }
        if let Some(date) = record.date {
            self.shift_dates.insert(date);
        }

        match mode {
            LinkageMode::RealData(index) => {
                if let Some(key) = record.component_key() {
                    if index.contains_rejection(&key) {
                        self.defective_keys.insert(key);
                    }
                }
            }
            LinkageMode::RuleBased(rule) => {
                if rule.matches(record) {
                    self.rule_hits += 1;
                }
            }
        }
    }

    fn finish(self, mode: &LinkageMode) -> WelderStats {
        let mut stats = self.stats;
        let defect_count = if mode.is_real_data() {
            self.defective_keys.len()
        } else {
            self.rule_hits
        };

        stats.unique_components = self.components.len();
        stats.unique_shift_dates = self.shift_dates.len();
        stats.defect_count = defect_count;
        stats.defect_rate = round_to(
            ratio_or_zero(defect_count as f64, stats.total as f64) * 100.0,
            1,
        );
        stats.avg_length = round_to(ratio_or_zero(stats.total_length, stats.total as f64), 2);
        stats.avg_length_per_shift = round_to(
            ratio_or_zero(stats.total_length, stats.unique_shift_dates as f64),
            2,
        );
        stats.score = stats.weighted_total - defect_count as f64 * PENALTY_PER_DEFECT;
        stats
    }
}

// ==========================================
// WelderTable - 聚合结果（插入顺序）
// ==========================================
#[derive(Debug, Clone, Default, Serialize)]
pub struct WelderTable {
    stats: Vec<WelderStats>,
}

impl WelderTable {
    pub fn iter(&self) -> impl Iterator<Item = &WelderStats> {
        self.stats.iter()
    }

    pub fn get(&self, welder: &str) -> Option<&WelderStats> {
        self.stats.iter().find(|s| s.welder == welder)
    }

    pub fn len(&self) -> usize {
        self.stats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stats.is_empty()
    }

    /// 按得分降序（稳定排序，同分保持首次出现顺序）
    pub fn ranking(&self) -> Vec<&WelderStats> {
        let mut ranked: Vec<&WelderStats> = self.stats.iter().collect();
        ranked.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
        ranked
    }

    /// 排名前 N
    pub fn top_n(&self, n: usize) -> Vec<&WelderStats> {
        let mut ranked = self.ranking();
        ranked.truncate(n);
        ranked
    }

    /// 缺陷总数（各焊工去重缺陷之和）
    pub fn total_defects(&self) -> usize {
        self.stats.iter().map(|s| s.defect_count).sum()
    }

    /// 缺陷数最多的 N 名焊工
    pub fn top_defect_welders(&self, n: usize) -> Vec<(String, usize)> {
        let mut ranked: Vec<&WelderStats> = self.stats.iter().collect();
        ranked.sort_by(|a, b| b.defect_count.cmp(&a.defect_count));
        ranked
            .into_iter()
            .take(n)
            .map(|s| (s.welder.clone(), s.defect_count))
            .collect()
    }

    pub fn into_vec(self) -> Vec<WelderStats> {
        self.stats
    }
}

/// 计算焊工统计
#[instrument(skip(records, mode), fields(count = records.len(), real_data = mode.is_real_data()))]
pub fn compute_welder_stats(records: &[WeldRecord], mode: &LinkageMode) -> WelderTable {
    let mut order: Vec<String> = Vec::new();
    let mut accumulators: HashMap<String, Accumulator> = HashMap::new();

    for record in records {
        let welder = record.welder_normalized.as_str();
        if !accumulators.contains_key(welder) {
            order.push(welder.to_string());
            accumulators.insert(welder.to_string(), Accumulator::new(welder));
        }
        if let Some(acc) = accumulators.get_mut(welder) {
            acc.add(record, mode);
        }
    }

    let stats: Vec<WelderStats> = order
        .iter()
        .filter_map(|welder| accumulators.remove(welder))
        .map(|acc| acc.finish(mode))
        .collect();

    for s in &stats {
        debug!(
            welder = %s.welder,
            total = s.total,
            defects = s.defect_count,
            defect_rate = s.defect_rate,
            weighted_total = s.weighted_total,
            "焊工统计"
        );
    }

    WelderTable { stats }
}

// ==========================================
// 焊工缺陷占比
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WelderDefectShare {
    pub welder: String,
    pub operations: usize,
    pub defect_count: usize,
    pub percent: f64, // 缺陷数 / 作业次数 × 100
}

/// 每个焊工的缺陷占比（分母为作业次数）
pub fn welder_defect_shares(records: &[WeldRecord], mode: &LinkageMode) -> Vec<WelderDefectShare> {
    compute_welder_stats(records, mode)
        .into_vec()
        .into_iter()
        .map(|s| WelderDefectShare {
            percent: ratio_or_zero(s.defect_count as f64, s.total as f64) * 100.0,
            welder: s.welder,
            operations: s.total,
            defect_count: s.defect_count,
        })
        .collect()
}
