// ==========================================
// 焊接生产分析看板 - 筛选引擎
// ==========================================
// 职责: 按筛选条件过滤焊接作业（保持加载顺序）
//       缺陷数据集仅按日期区间独立过滤
// 红线: 日期输入非法 → 整个筛选被拒绝，调用方状态不变
// ==========================================

use crate::domain::types::{lenient_parse_f64, CellValue, WeldDate};
use crate::domain::weld::{DefectRecord, WeldRecord};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, instrument};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum FilterError {
    #[error("日期格式错误 ({field}): 期望 DD.MM.YYYY，实际 {value}")]
    InvalidDate { field: String, value: String },
}

// ==========================================
// FilterSpec - 筛选条件（全部可选，空白 = 不限）
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FilterSpec {
    pub date_from: Option<String>,
    pub date_to: Option<String>,
    pub order: Option<String>,
    pub component: Option<String>,
    pub welder: Option<String>,
    pub diameter: Option<String>,
    pub thickness: Option<String>,
    pub cutting: Option<String>,
}

fn active(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

impl FilterSpec {
    pub fn is_empty(&self) -> bool {
        [
            &self.date_from,
            &self.date_to,
            &self.order,
            &self.component,
            &self.welder,
            &self.diameter,
            &self.thickness,
            &self.cutting,
        ]
        .into_iter()
        .all(|v| active(v).is_none())
    }

    /// 解析日期区间
    pub fn date_range(&self) -> Result<DateRange, FilterError> {
        Ok(DateRange {
            from: parse_bound("dateFrom", &self.date_from)?,
            to: parse_bound("dateTo", &self.date_to)?,
        })
    }
}

fn parse_bound(field: &str, value: &Option<String>) -> Result<Option<WeldDate>, FilterError> {
    match active(value) {
        None => Ok(None),
        Some(v) => WeldDate::parse(v)
            .map(Some)
            .ok_or_else(|| FilterError::InvalidDate {
                field: field.to_string(),
                value: v.to_string(),
            }),
    }
}

// ==========================================
// DateRange - 闭区间
// ==========================================
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub from: Option<WeldDate>,
    pub to: Option<WeldDate>,
}

impl DateRange {
    pub fn is_unbounded(&self) -> bool {
        self.from.is_none() && self.to.is_none()
    }

    /// 日期是否落在区间内（有界时，无日期视为不在区间内）
    pub fn contains(&self, date: Option<WeldDate>) -> bool {
        if self.is_unbounded() {
            return true;
        }
        let Some(date) = date else {
            return false;
        };
        self.from.map_or(true, |from| date >= from) && self.to.map_or(true, |to| date <= to)
    }
}

// ==========================================
// 字段匹配
// ==========================================

/// 忽略大小写的子串匹配
fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

fn text_matches(value: Option<&str>, needle: Option<&str>) -> bool {
    match needle {
        None => true,
        Some(needle) => value.is_some_and(|v| contains_ci(v, needle)),
    }
}

/// 数值字段：双方可解析为数 → 精确相等；否则回落为子串匹配
fn numeric_matches(cell: Option<&CellValue>, needle: Option<&str>) -> bool {
    let Some(needle) = needle else {
        return true;
    };
    let Some(cell) = cell.filter(|c| !c.is_empty()) else {
        return false;
    };

    let cell_number = match cell {
        CellValue::Text(s) => lenient_parse_f64(s),
        other => other.as_number(),
    };

    match (cell_number, lenient_parse_f64(needle)) {
        (Some(a), Some(b)) => a == b,
        _ => contains_ci(&cell.to_string(), needle),
    }
}

fn record_matches(record: &WeldRecord, spec: &FilterSpec, range: &DateRange) -> bool {
    range.contains(record.date)
        && text_matches(record.order_id.as_deref(), active(&spec.order))
        && text_matches(record.component_id.as_deref(), active(&spec.component))
        && text_matches(record.welder_name.as_deref(), active(&spec.welder))
        && text_matches(record.cutting_type.as_deref(), active(&spec.cutting))
        && numeric_matches(record.diameter.as_ref(), active(&spec.diameter))
        && numeric_matches(record.thickness.as_ref(), active(&spec.thickness))
}

// ==========================================
// 公开入口
// ==========================================

/// 过滤焊接作业（保持原始加载顺序）
///
/// # 返回
/// - Ok: 过滤结果
/// - Err(InvalidDate): 日期输入非法，未执行任何过滤
#[instrument(skip(records, spec), fields(count = records.len()))]
pub fn filter(records: &[WeldRecord], spec: &FilterSpec) -> Result<Vec<WeldRecord>, FilterError> {
    let range = spec.date_range()?;

    let filtered: Vec<WeldRecord> = records
        .iter()
        .filter(|r| record_matches(r, spec, &range))
        .cloned()
        .collect();

    debug!(kept = filtered.len(), "筛选完成");
    Ok(filtered)
}

/// 缺陷数据集的日期过滤（无发现日期的行保留）
pub fn filter_defects(defects: &[DefectRecord], range: &DateRange) -> Vec<DefectRecord> {
    defects
        .iter()
        .filter(|d| d.detection_date.is_none() || range.contains(d.detection_date))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn record(date: &str, order: &str, welder: &str, diameter: Option<CellValue>) -> WeldRecord {
        WeldRecord {
            row_number: 2,
            date: WeldDate::parse(date),
            order_id: Some(order.to_string()),
            component_id: Some("1".to_string()),
            welder_name: Some(welder.to_string()),
            welder_normalized: welder.to_uppercase(),
            weld_length_m: 1.0,
            wire_total: 1.0,
            diameter,
            thickness: None,
            cutting_type: Some("А1".to_string()),
            wire_material: None,
            cells: HashMap::new(),
        }
    }

    fn spec() -> FilterSpec {
        FilterSpec::default()
    }

    #[test]
    fn test_filter_empty_spec_keeps_all_in_order() {
        let records = vec![
            record("15.02.2024", "B", "Петров", None),
            record("", "A", "Иванов", None),
        ];
        let result = filter(&records, &spec()).unwrap();
        assert_eq!(result.len(), 2);
        assert_eq!(result[0].order_id.as_deref(), Some("B"));
        assert!(spec().is_empty());
    }

    #[test]
    fn test_filter_date_range_inclusive() {
        let records = vec![
            record("01.01.2024", "A", "x", None),
            record("31.01.2024", "B", "x", None),
            record("01.02.2024", "C", "x", None),
            record("", "D", "x", None),
        ];
        let spec = FilterSpec {
            date_from: Some("01.01.2024".to_string()),
            date_to: Some("31.01.2024".to_string()),
            ..spec()
        };

        let result = filter(&records, &spec).unwrap();

        let orders: Vec<_> = result.iter().filter_map(|r| r.order_id.as_deref()).collect();
        assert_eq!(orders, vec!["A", "B"]);
    }

    #[test]
    fn test_filter_invalid_date_is_rejected() {
        let spec = FilterSpec {
            date_from: Some("2024-01-01".to_string()),
            ..spec()
        };
        let err = filter(&[], &spec).unwrap_err();
        assert_eq!(
            err,
            FilterError::InvalidDate {
                field: "dateFrom".to_string(),
                value: "2024-01-01".to_string()
            }
        );
    }

    #[test]
    fn test_filter_text_case_insensitive_substring() {
        let records = vec![
            record("", "ZK-100", "Иванов", None),
            record("", "ZK-200", "Петров", None),
        ];
        let spec = FilterSpec {
            order: Some("zk-1".to_string()),
            ..spec()
        };
        assert_eq!(filter(&records, &spec).unwrap().len(), 1);

        let spec = FilterSpec {
            welder: Some("ПЕТР".to_string()),
            ..FilterSpec::default()
        };
        let result = filter(&records, &spec).unwrap();
        assert_eq!(result[0].order_id.as_deref(), Some("ZK-200"));
    }

    #[test]
    fn test_filter_welder_skips_nameless_records() {
        let mut nameless = record("", "A", "x", None);
        nameless.welder_name = None;
        nameless.welder_normalized = "Unknown".to_string();
        let records = vec![nameless, record("", "B", "Иванов", None)];

        let spec = FilterSpec {
            welder: Some("unknown".to_string()),
            ..spec()
        };
        assert!(filter(&records, &spec).unwrap().is_empty());

        let spec = FilterSpec {
            welder: Some("иван".to_string()),
            ..FilterSpec::default()
        };
        let result = filter(&records, &spec).unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].order_id.as_deref(), Some("B"));
    }

    #[test]
    fn test_filter_numeric_exact_and_missing_field() {
        let records = vec![
            record("", "A", "x", Some(CellValue::Int(600))),
            record("", "B", "x", Some(CellValue::Int(6000))),
            record("", "C", "x", None),
        ];
        let spec = FilterSpec {
            diameter: Some("600".to_string()),
            ..spec()
        };

        let result = filter(&records, &spec).unwrap();

        assert_eq!(result.len(), 1);
        assert_eq!(result[0].order_id.as_deref(), Some("A"));
    }

    #[test]
    fn test_filter_numeric_falls_back_to_substring() {
        let records = vec![record("", "A", "x", Some(CellValue::Text("600/800".to_string())))];
        let spec = FilterSpec {
            diameter: Some("800".to_string()),
            ..spec()
        };
        assert_eq!(filter(&records, &spec).unwrap().len(), 1);
    }

    #[test]
    fn test_filter_defects_keeps_undated() {
        let mk = |date: &str| DefectRecord {
            row_number: 2,
            order_id: Some("A".to_string()),
            component_id: Some("1".to_string()),
            stage: crate::domain::types::DefectStage::PrimaryRejection,
            stage_label: None,
            detection_date: WeldDate::parse(date),
            executor_normalized: None,
            cells: HashMap::new(),
        };
        let range = DateRange {
            from: WeldDate::parse("01.01.2024"),
            to: WeldDate::parse("31.01.2024"),
        };

        let result = filter_defects(&[mk("10.01.2024"), mk("10.02.2024"), mk("")], &range);

        assert_eq!(result.len(), 2);
    }
}
