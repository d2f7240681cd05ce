// ==========================================
// 焊接生产分析看板 - 领域类型定义
// ==========================================
// 职责: 日期值、单元格值、周期/聚合/运算符等枚举
// ==========================================

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 日期值 (DD.MM.YYYY)
// ==========================================
// 宽松校验: 日∈[1,31]、月∈[1,12]、年∈[2000,2100]，不做日历合法性校验
// 字段顺序即排序顺序 (年 → 月 → 日)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct WeldDate {
    pub year: i32,
    pub month: u32,
    pub day: u32,
}

impl WeldDate {
    pub const MIN_YEAR: i32 = 2000;
    pub const MAX_YEAR: i32 = 2100;

    /// 解析 `DD.MM.YYYY`，范围外或格式不符返回 None
    pub fn parse(value: &str) -> Option<Self> {
        let mut parts = value.trim().split('.');
        let day = parse_part(parts.next()?, 2)?;
        let month = parse_part(parts.next()?, 2)?;
        let year = parse_part(parts.next()?, 4)?;
        if parts.next().is_some() {
            return None;
        }

        let date = Self {
            year: year as i32,
            month,
            day,
        };
        date.in_range().then_some(date)
    }

    fn in_range(&self) -> bool {
        (1..=31).contains(&self.day)
            && (1..=12).contains(&self.month)
            && (Self::MIN_YEAR..=Self::MAX_YEAR).contains(&self.year)
    }

    /// 季度 (1-4)
    pub fn quarter(&self) -> u32 {
        (self.month + 2) / 3
    }

    /// 周期分桶键（零填充，字典序即时间序）
    pub fn bucket_key(&self, period: Period) -> String {
        match period {
            Period::Day => format!("{:04}-{:02}-{:02}", self.year, self.month, self.day),
            Period::Month => format!("{:04}-{:02}", self.year, self.month),
            Period::Quarter => format!("{:04}-Q{}", self.year, self.quarter()),
            Period::Year => format!("{:04}", self.year),
        }
    }

    /// 转换为日历日期（2 月 30 日等不存在的日期返回 None）
    pub fn to_naive(&self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month, self.day)
    }
}

impl From<NaiveDate> for WeldDate {
    fn from(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
            day: date.day(),
        }
    }
}

impl fmt::Display for WeldDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}.{:02}.{:04}", self.day, self.month, self.year)
    }
}

fn parse_part(part: &str, max_len: usize) -> Option<u32> {
    if part.is_empty() || part.len() > max_len || !part.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    part.parse().ok()
}

// ==========================================
// 单元格值 (归一化后的列值)
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    Int(i64),
    Float(f64),
    Text(String),
    Empty,
}

impl CellValue {
    pub fn is_empty(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.is_empty(),
            _ => false,
        }
    }

    /// 数值视图（文本不做解析）
    pub fn as_number(&self) -> Option<f64> {
        match self {
            CellValue::Int(v) => Some(*v as f64),
            CellValue::Float(v) => Some(*v),
            _ => None,
        }
    }

    /// 宽松数值：数值直接返回，文本按逗号/点解析，失败为 0
    pub fn lenient_f64(&self) -> f64 {
        match self {
            CellValue::Int(v) => *v as f64,
            CellValue::Float(v) => *v,
            CellValue::Text(s) => lenient_parse_f64(s).unwrap_or(0.0),
            CellValue::Empty => 0.0,
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Int(v) => write!(f, "{}", v),
            CellValue::Float(v) => write!(f, "{}", v),
            CellValue::Text(s) => write!(f, "{}", s),
            CellValue::Empty => Ok(()),
        }
    }
}

/// 宽松解析浮点数（支持逗号小数点）
pub fn lenient_parse_f64(value: &str) -> Option<f64> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed
        .replace(',', ".")
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
}

// ==========================================
// 分桶周期 / 聚合方式
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    Day,
    Month,
    Quarter,
    Year,
}

impl std::str::FromStr for Period {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "day" => Ok(Period::Day),
            "month" => Ok(Period::Month),
            "quarter" => Ok(Period::Quarter),
            "year" => Ok(Period::Year),
            other => Err(format!("未知周期: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AggType {
    Sum,
    Avg,
    Count,
}

impl std::str::FromStr for AggType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "sum" => Ok(AggType::Sum),
            "avg" => Ok(AggType::Avg),
            "count" => Ok(AggType::Count),
            other => Err(format!("未知聚合方式: {}", other)),
        }
    }
}

// ==========================================
// 规则运算符 (= / != / > / <)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RuleOperator {
    #[serde(rename = "=")]
    Eq,
    #[serde(rename = "!=")]
    Ne,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = "<")]
    Lt,
}

impl fmt::Display for RuleOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleOperator::Eq => write!(f, "="),
            RuleOperator::Ne => write!(f, "!="),
            RuleOperator::Gt => write!(f, ">"),
            RuleOperator::Lt => write!(f, "<"),
        }
    }
}

// ==========================================
// 缺陷工序阶段
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DefectStage {
    PrimaryRejection, // 首次提交判废
    Rework,           // 重复返修
    Other(String),    // 其他工序（按原始标签分组）
    Unspecified,      // 工序为空
}

impl DefectStage {
    pub fn label(&self) -> &str {
        match self {
            DefectStage::PrimaryRejection => "primary-rejection",
            DefectStage::Rework => "rework",
            DefectStage::Other(label) => label,
            DefectStage::Unspecified => "",
        }
    }
}

// ==========================================
// 姓名大小写方式
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum NameCase {
    #[default]
    Upper,
    Title,
}

// ==========================================
// KPI 状态 / 趋势方向
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KpiStatus {
    Good,
    Warning,
    Bad,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Up,
    Down,
    Flat,
}

impl TrendDirection {
    pub fn of(delta: f64) -> Self {
        if delta > 0.0 {
            TrendDirection::Up
        } else if delta < 0.0 {
            TrendDirection::Down
        } else {
            TrendDirection::Flat
        }
    }
}

/// 趋势单位：相对百分比 或 百分点
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendUnit {
    Percent,
    PercentagePoints,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weld_date_parse_valid() {
        let date = WeldDate::parse("15.01.2024").unwrap();
        assert_eq!(date.year, 2024);
        assert_eq!(date.month, 1);
        assert_eq!(date.day, 15);

        // 单位数日/月也接受
        assert!(WeldDate::parse("1.2.2024").is_some());
    }

    #[test]
    fn test_weld_date_parse_loose_calendar() {
        // 宽松校验: 2 月 30 日通过
        let date = WeldDate::parse("30.02.2024").unwrap();
        assert_eq!(date.to_naive(), None);
    }

    #[test]
    fn test_weld_date_parse_rejects_out_of_range() {
        assert!(WeldDate::parse("32.01.2024").is_none());
        assert!(WeldDate::parse("00.01.2024").is_none());
        assert!(WeldDate::parse("10.13.2024").is_none());
        assert!(WeldDate::parse("10.01.1999").is_none());
        assert!(WeldDate::parse("10.01.2101").is_none());
        assert!(WeldDate::parse("2024-01-10").is_none());
        assert!(WeldDate::parse("10.01.2024.1").is_none());
        assert!(WeldDate::parse("").is_none());
    }

    #[test]
    fn test_weld_date_ordering() {
        let a = WeldDate::parse("31.01.2024").unwrap();
        let b = WeldDate::parse("01.02.2024").unwrap();
        assert!(a < b);
    }

    #[test]
    fn test_bucket_keys() {
        let date = WeldDate::parse("05.08.2024").unwrap();
        assert_eq!(date.bucket_key(Period::Day), "2024-08-05");
        assert_eq!(date.bucket_key(Period::Month), "2024-08");
        assert_eq!(date.bucket_key(Period::Quarter), "2024-Q3");
        assert_eq!(date.bucket_key(Period::Year), "2024");
    }

    #[test]
    fn test_lenient_parse() {
        assert_eq!(lenient_parse_f64("12,5"), Some(12.5));
        assert_eq!(lenient_parse_f64(" 3 "), Some(3.0));
        assert_eq!(lenient_parse_f64("abc"), None);
        assert_eq!(CellValue::Text("x".to_string()).lenient_f64(), 0.0);
    }
}
