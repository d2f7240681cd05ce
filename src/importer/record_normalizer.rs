// ==========================================
// 焊接生产分析看板 - 记录归一化器
// ==========================================
// 流程:
// 1. 表头解析（列分类 + 别名下标，一次完成）
// 2. 行级校验（列数）
// 3. 单元格类型转换
// 4. 逻辑字段抽取（首个非空别名）
// 5. 日期校验（非空非法 → 丢弃并告警）
// 6. 姓名归一化 / 工序分类
// ==========================================

use crate::domain::types::{CellValue, DefectStage, NameCase};
use crate::domain::weld::{
    DefectRecord, NormalizedDataset, RowWarning, WeldRecord, UNKNOWN_WELDER,
};
use crate::importer::data_cleaner::DataCleaner;
use crate::importer::dq_validator::{DqReport, DqValidator};
use crate::importer::field_mapper::{ColumnSchema, FieldMapper, LogicalField, ResolvedColumns};
use crate::importer::file_parser::{RawRow, RawTable};
use std::collections::HashMap;
use tracing::{debug, instrument, warn};

#[derive(Debug, Clone, Default)]
pub struct RecordNormalizer {
    mapper: FieldMapper,
    cleaner: DataCleaner,
    validator: DqValidator,
}

/// 单行的类型化单元格 + 列布局
struct TypedRow<'a> {
    values: Vec<CellValue>,
    columns: &'a ResolvedColumns,
}

impl TypedRow<'_> {
    fn field(&self, field: LogicalField) -> Option<&CellValue> {
        self.columns.first_populated(field, &self.values)
    }
}

impl RecordNormalizer {
    pub fn new(schema: ColumnSchema, name_case: NameCase) -> Self {
        Self {
            mapper: FieldMapper::new(schema),
            cleaner: DataCleaner::new(name_case),
            validator: DqValidator,
        }
    }

    pub fn mapper(&self) -> &FieldMapper {
        &self.mapper
    }

    // ==========================================
    // 主数据集（焊接作业）
    // ==========================================

    /// 归一化焊接作业表
    ///
    /// 问题行（列数不符、日期非法）被丢弃并记录到 warnings，不中断加载
    #[instrument(skip(self, table), fields(rows = table.rows.len()))]
    pub fn normalize_weld(&self, table: &RawTable) -> NormalizedDataset<WeldRecord> {
        let columns = self.mapper.resolve(&table.headers);
        let mut records = Vec::with_capacity(table.rows.len());
        let mut warnings = Vec::new();

        for row in &table.rows {
            match self.weld_record(table, &columns, row) {
                Ok(record) => records.push(record),
                Err(warning) => {
                    warn!(row = warning.row_number, "{}", warning.message);
                    warnings.push(warning);
                }
            }
        }

        debug!(
            accepted = records.len(),
            dropped = warnings.len(),
            "焊接作业表归一化完成"
        );

        NormalizedDataset {
            records,
            headers: table.headers.clone(),
            warnings,
        }
    }

    fn weld_record(
        &self,
        table: &RawTable,
        columns: &ResolvedColumns,
        row: &RawRow,
    ) -> Result<WeldRecord, RowWarning> {
        let typed = self.typed_row(table, columns, row)?;

        let date = self.validator.validate_date(
            row.row_number,
            "date",
            self.cleaner.cell_text(typed.field(LogicalField::Date)).as_deref(),
        )?;

        let welder_name = self.cleaner.cell_text(typed.field(LogicalField::Welder));
        let welder_normalized = welder_name
            .as_deref()
            .and_then(|n| self.cleaner.normalize_person_name(n))
            .unwrap_or_else(|| UNKNOWN_WELDER.to_string());

        // 焊缝长度在类型转换阶段已由毫米换算为米
        let weld_length_m = typed
            .field(LogicalField::WeldLength)
            .map(CellValue::lenient_f64)
            .unwrap_or(0.0)
            .max(0.0);

        Ok(WeldRecord {
            row_number: row.row_number,
            date,
            order_id: self.cleaner.cell_text(typed.field(LogicalField::Order)),
            component_id: self.cleaner.cell_text(typed.field(LogicalField::Component)),
            welder_name,
            welder_normalized,
            weld_length_m,
            wire_total: typed
                .field(LogicalField::WireTotal)
                .map(CellValue::lenient_f64)
                .unwrap_or(0.0),
            diameter: typed.field(LogicalField::Diameter).cloned(),
            thickness: typed.field(LogicalField::Thickness).cloned(),
            cutting_type: self.cleaner.cell_text(typed.field(LogicalField::CuttingType)),
            wire_material: self.cleaner.cell_text(typed.field(LogicalField::WireMaterial)),
            cells: Self::cell_map(&table.headers, typed.values),
        })
    }

    // ==========================================
    // 缺陷数据集
    // ==========================================

    /// 归一化缺陷表
    #[instrument(skip(self, table), fields(rows = table.rows.len()))]
    pub fn normalize_defects(&self, table: &RawTable) -> NormalizedDataset<DefectRecord> {
        let columns = self.mapper.resolve(&table.headers);
        let mut records = Vec::with_capacity(table.rows.len());
        let mut warnings = Vec::new();

        for row in &table.rows {
            match self.defect_record(table, &columns, row) {
                Ok(record) => records.push(record),
                Err(warning) => {
                    warn!(row = warning.row_number, "{}", warning.message);
                    warnings.push(warning);
                }
            }
        }

        NormalizedDataset {
            records,
            headers: table.headers.clone(),
            warnings,
        }
    }

    fn defect_record(
        &self,
        table: &RawTable,
        columns: &ResolvedColumns,
        row: &RawRow,
    ) -> Result<DefectRecord, RowWarning> {
        let typed = self.typed_row(table, columns, row)?;

        let detection_date = self.validator.validate_date(
            row.row_number,
            "detection_date",
            self.cleaner
                .cell_text(typed.field(LogicalField::DetectionDate))
                .as_deref(),
        )?;

        let stage_label = self.cleaner.cell_text(typed.field(LogicalField::Stage));
        let stage = self.classify_stage(stage_label.as_deref());

        Ok(DefectRecord {
            row_number: row.row_number,
            order_id: self.cleaner.cell_text(typed.field(LogicalField::Order)),
            component_id: self.cleaner.cell_text(typed.field(LogicalField::Component)),
            stage,
            stage_label,
            detection_date,
            executor_normalized: self
                .cleaner
                .cell_text(typed.field(LogicalField::Executor))
                .and_then(|n| self.cleaner.normalize_person_name(&n)),
            cells: Self::cell_map(&table.headers, typed.values),
        })
    }

    /// 工序标签 → 阶段（忽略大小写的完全匹配）
    pub fn classify_stage(&self, label: Option<&str>) -> DefectStage {
        let label = match label.map(str::trim) {
            None | Some("") => return DefectStage::Unspecified,
            Some(l) => l,
        };

        let schema = self.mapper.schema();
        let matches = |set: &[String]| set.iter().any(|s| s.to_lowercase() == label.to_lowercase());

        if matches(&schema.primary_rejection_labels) {
            DefectStage::PrimaryRejection
        } else if matches(&schema.rework_labels) {
            DefectStage::Rework
        } else {
            DefectStage::Other(label.to_string())
        }
    }

    // ==========================================
    // 内部工具
    // ==========================================

    fn typed_row<'a>(
        &self,
        table: &RawTable,
        columns: &'a ResolvedColumns,
        row: &RawRow,
    ) -> Result<TypedRow<'a>, RowWarning> {
        self.validator.validate_shape(row, table.headers.len())?;

        let values = row
            .cells
            .iter()
            .zip(&columns.kinds)
            .map(|(raw, kind)| self.mapper.coerce(*kind, raw))
            .collect();

        Ok(TypedRow { values, columns })
    }

    fn cell_map(headers: &[String], values: Vec<CellValue>) -> HashMap<String, CellValue> {
        headers.iter().cloned().zip(values).collect()
    }

    /// 生成 DQ 报告
    pub fn report<T>(&self, dataset: &str, normalized: &NormalizedDataset<T>) -> DqReport {
        self.validator.generate_report(
            dataset,
            normalized.records.len() + normalized.warnings.len(),
            normalized.warnings.clone(),
        )
    }
}

/// 便捷入口：用默认列配置归一化焊接作业表
pub fn normalize(table: &RawTable) -> NormalizedDataset<WeldRecord> {
    RecordNormalizer::default().normalize_weld(table)
}

/// 便捷入口：用默认列配置归一化缺陷表
pub fn normalize_defects(table: &RawTable) -> NormalizedDataset<DefectRecord> {
    RecordNormalizer::default().normalize_defects(table)
}
