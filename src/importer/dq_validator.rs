// ==========================================
// 焊接生产分析看板 - 数据质量校验器实现
// ==========================================
// 职责: 行级校验（列数、日期格式）+ DQ 报告生成
// 失败策略: 问题行丢弃并记录告警，加载继续
// ==========================================

use crate::domain::types::WeldDate;
use crate::domain::weld::RowWarning;
use crate::importer::error::ImportError;
use crate::importer::file_parser::RawRow;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DqSummary {
    pub total_rows: usize,
    pub accepted: usize,
    pub dropped: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DqReport {
    pub dataset: String,
    pub summary: DqSummary,
    pub warnings: Vec<RowWarning>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DqValidator;

impl DqValidator {
    /// 校验列数与表头一致
    pub fn validate_shape(&self, row: &RawRow, header_count: usize) -> Result<(), RowWarning> {
        if row.cells.len() == header_count {
            return Ok(());
        }

        let err = ImportError::ColumnCountMismatch {
            row: row.row_number,
            expected: header_count,
            actual: row.cells.len(),
        };
        Err(RowWarning {
            row_number: row.row_number,
            field: None,
            message: err.to_string(),
        })
    }

    /// 校验日期字段
    ///
    /// # 返回
    /// - Ok(None): 字段为空（保留该行）
    /// - Ok(Some): 合法日期
    /// - Err: 非空但不符合 DD.MM.YYYY（丢弃该行）
    pub fn validate_date(
        &self,
        row_number: usize,
        field: &str,
        value: Option<&str>,
    ) -> Result<Option<WeldDate>, RowWarning> {
        let value = match value.map(str::trim) {
            None | Some("") => return Ok(None),
            Some(v) => v,
        };

        WeldDate::parse(value).map(Some).ok_or_else(|| {
            let err = ImportError::DateFormatError {
                row: row_number,
                field: field.to_string(),
                value: value.to_string(),
            };
            RowWarning {
                row_number,
                field: Some(field.to_string()),
                message: err.to_string(),
            }
        })
    }

    /// 生成 DQ 报告
    pub fn generate_report(
        &self,
        dataset: &str,
        total_rows: usize,
        warnings: Vec<RowWarning>,
    ) -> DqReport {
        let dropped = warnings.len();
        DqReport {
            dataset: dataset.to_string(),
            summary: DqSummary {
                total_rows,
                accepted: total_rows.saturating_sub(dropped),
                dropped,
            },
            warnings,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(cells: &[&str]) -> RawRow {
        RawRow {
            row_number: 5,
            cells: cells.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn test_validate_shape_mismatch() {
        let warning = DqValidator.validate_shape(&row(&["a", "b"]), 3).unwrap_err();
        assert_eq!(warning.row_number, 5);
        assert!(warning.message.contains("列数不符"));
        assert!(DqValidator.validate_shape(&row(&["a", "b", "c"]), 3).is_ok());
    }

    #[test]
    fn test_validate_date_empty_is_kept() {
        assert_eq!(DqValidator.validate_date(2, "Дата", None).unwrap(), None);
        assert_eq!(DqValidator.validate_date(2, "Дата", Some("  ")).unwrap(), None);
    }

    #[test]
    fn test_validate_date_invalid_is_warning() {
        let warning = DqValidator
            .validate_date(7, "Дата", Some("2024-01-15"))
            .unwrap_err();
        assert_eq!(warning.field.as_deref(), Some("Дата"));
        assert_eq!(warning.row_number, 7);
    }

    #[test]
    fn test_generate_report_counts() {
        let warnings = vec![RowWarning {
            row_number: 3,
            field: None,
            message: "x".to_string(),
        }];
        let report = DqValidator.generate_report("main", 10, warnings);
        assert_eq!(report.summary.accepted, 9);
        assert_eq!(report.summary.dropped, 1);
    }
}
