// ==========================================
// 焊接生产分析看板 - 缺陷分类器
// ==========================================
// 职责:
// 1. 按工序标签划分缺陷（判废 / 返修 / 其他按标签直方）
// 2. 焊工返修发生率
// 3. 无缺陷数据时的规则判定（字段 运算符 值）
// 4. 关联模式: 真实数据 或 规则
// ==========================================

use crate::domain::types::{lenient_parse_f64, CellValue, DefectStage, RuleOperator};
use crate::domain::weld::{DefectRecord, WeldRecord};
use crate::engine::linkage::DefectLinkageIndex;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use thiserror::Error;
use tracing::instrument;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RuleError {
    #[error("未知运算符: {0}（仅支持 = != > <）")]
    UnknownOperator(String),

    #[error("规则字段为空")]
    EmptyField,
}

// ==========================================
// DefectRule - 缺陷判定规则
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RuleValue {
    Number(f64),
    Text(String),
}

impl fmt::Display for RuleValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleValue::Number(v) => write!(f, "{}", v),
            RuleValue::Text(s) => write!(f, "{}", s),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DefectRule {
    pub field: String,
    pub operator: RuleOperator,
    pub value: RuleValue,
}

impl Default for DefectRule {
    fn default() -> Self {
        Self {
            field: "ИТОГО проволока".to_string(),
            operator: RuleOperator::Eq,
            value: RuleValue::Number(0.0),
        }
    }
}

impl fmt::Display for DefectRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.field, self.operator, self.value)
    }
}

impl DefectRule {
    /// 由文本输入构建规则；值可解析为数时按数值处理
    pub fn parse(field: &str, operator: &str, value: &str) -> Result<Self, RuleError> {
        let field = field.trim();
        if field.is_empty() {
            return Err(RuleError::EmptyField);
        }

        let operator = match operator.trim() {
            "=" => RuleOperator::Eq,
            "!=" => RuleOperator::Ne,
            ">" => RuleOperator::Gt,
            "<" => RuleOperator::Lt,
            other => return Err(RuleError::UnknownOperator(other.to_string())),
        };

        let value = match lenient_parse_f64(value) {
            Some(n) => RuleValue::Number(n),
            None => RuleValue::Text(value.trim().to_string()),
        };

        Ok(Self {
            field: field.to_string(),
            operator,
            value,
        })
    }

    /// 对单条作业求值
    ///
    /// - `>` `<`: 双方宽松解析为数，任一失败 → false
    /// - `=` `!=`: 不做宽松转换；数值单元格按数值比较，文本单元格与规则值的文本形式完全比较
    pub fn matches(&self, record: &WeldRecord) -> bool {
        let cell = lookup_cell(record, &self.field);

        match self.operator {
            RuleOperator::Gt | RuleOperator::Lt => {
                let lhs = cell.and_then(numeric_view);
                let rhs = match &self.value {
                    RuleValue::Number(n) => Some(*n),
                    RuleValue::Text(s) => lenient_parse_f64(s),
                };
                match (lhs, rhs) {
                    (Some(a), Some(b)) if self.operator == RuleOperator::Gt => a > b,
                    (Some(a), Some(b)) => a < b,
                    _ => false,
                }
            }
            RuleOperator::Eq => strict_eq(cell, &self.value),
            RuleOperator::Ne => !strict_eq(cell, &self.value),
        }
    }
}

/// 按表头名取列值：先精确匹配，再忽略大小写
fn lookup_cell<'a>(record: &'a WeldRecord, field: &str) -> Option<&'a CellValue> {
    record.cell(field).or_else(|| {
        let key = field.to_lowercase();
        record
            .cells
            .iter()
            .find(|(header, _)| header.to_lowercase() == key)
            .map(|(_, value)| value)
    })
}

fn numeric_view(cell: &CellValue) -> Option<f64> {
    match cell {
        CellValue::Text(s) => lenient_parse_f64(s),
        other => other.as_number(),
    }
}

fn strict_eq(cell: Option<&CellValue>, value: &RuleValue) -> bool {
    match (cell, value) {
        (Some(CellValue::Int(v)), RuleValue::Number(n)) => (*v as f64) == *n,
        (Some(CellValue::Float(v)), RuleValue::Number(n)) => v == n,
        (Some(CellValue::Text(s)), RuleValue::Text(t)) => s.trim() == t.trim(),
        // 文本列（订单号、封头号等）中的数字形式值
        (Some(CellValue::Text(s)), RuleValue::Number(n)) => s.trim() == n.to_string(),
        _ => false,
    }
}

// ==========================================
// LinkageMode - 缺陷判定模式（每个会话选定一次）
// ==========================================
#[derive(Debug, Clone)]
pub enum LinkageMode {
    RealData(DefectLinkageIndex),
    RuleBased(DefectRule),
}

impl LinkageMode {
    /// 单条作业是否判为缺陷
    pub fn is_defective(&self, record: &WeldRecord) -> bool {
        match self {
            LinkageMode::RealData(index) => index.is_defective(record),
            LinkageMode::RuleBased(rule) => rule.matches(record),
        }
    }

    pub fn is_real_data(&self) -> bool {
        matches!(self, LinkageMode::RealData(_))
    }

    /// 数据来源标签
    pub fn label(&self) -> String {
        match self {
            LinkageMode::RealData(_) => "real-data".to_string(),
            LinkageMode::RuleBased(rule) => format!("rule: {}", rule),
        }
    }
}

// ==========================================
// 工序划分
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageCount {
    pub label: String,
    pub count: usize,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct DefectBreakdown {
    pub rejection: Vec<DefectRecord>,
    pub rework: Vec<DefectRecord>,
    pub other_by_stage: Vec<StageCount>, // 首次出现顺序
}

impl DefectBreakdown {
    /// 返修饼图: (首次提交判废, 重复返修)
    pub fn rework_pie(&self) -> (usize, usize) {
        (self.rejection.len(), self.rework.len())
    }

    pub fn other_total(&self) -> usize {
        self.other_by_stage.iter().map(|s| s.count).sum()
    }
}

/// 按工序划分缺陷记录（空标签不计入其他）
#[instrument(skip(defects), fields(count = defects.len()))]
pub fn classify_defects(defects: &[DefectRecord]) -> DefectBreakdown {
    let mut breakdown = DefectBreakdown::default();
    let mut positions: HashMap<String, usize> = HashMap::new();

    for defect in defects {
        match &defect.stage {
            DefectStage::PrimaryRejection => breakdown.rejection.push(defect.clone()),
            DefectStage::Rework => breakdown.rework.push(defect.clone()),
            DefectStage::Other(label) => match positions.get(label) {
                Some(&idx) => breakdown.other_by_stage[idx].count += 1,
                None => {
                    positions.insert(label.clone(), breakdown.other_by_stage.len());
                    breakdown.other_by_stage.push(StageCount {
                        label: label.clone(),
                        count: 1,
                    });
                }
            },
            DefectStage::Unspecified => {}
        }
    }

    breakdown
}

// ==========================================
// 焊工返修发生率
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReworkIncidence {
    pub welder: String,
    pub reworked_components: usize,
    pub total_components: usize,
}

#[derive(Default)]
struct ComponentSets {
    components: HashSet<String>,
    reworked: HashSet<String>,
}

/// 每个焊工: 返修组合键数 / 去重封头数（焊工按首次出现顺序）
pub fn rework_incidence(records: &[WeldRecord], index: &DefectLinkageIndex) -> Vec<ReworkIncidence> {
    let mut order: Vec<String> = Vec::new();
    let mut sets: HashMap<String, ComponentSets> = HashMap::new();

    for record in records {
        let entry = sets
            .entry(record.welder_normalized.clone())
            .or_insert_with(|| {
                order.push(record.welder_normalized.clone());
                ComponentSets::default()
            });

        if let Some(component) = record.component_id.as_deref().map(str::trim) {
            if !component.is_empty() {
                entry.components.insert(component.to_string());
            }
        }
        if let Some(key) = record.component_key() {
            if index.contains_rework(&key) {
                entry.reworked.insert(key);
            }
        }
    }

    order
        .into_iter()
        .filter_map(|welder| {
            sets.remove(&welder).map(|s| ReworkIncidence {
                welder,
                reworked_components: s.reworked.len(),
                total_components: s.components.len(),
            })
        })
        .collect()
}
