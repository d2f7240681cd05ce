// ==========================================
// 测试辅助函数
// ==========================================
// 职责: 记录构建、临时 CSV 文件、临时配置库
// ==========================================

#![allow(dead_code)]

use std::collections::HashMap;
use std::error::Error;
use std::io::Write;
use tempfile::NamedTempFile;
use weld_analytics::domain::types::{CellValue, DefectStage, WeldDate};
use weld_analytics::domain::weld::{DefectRecord, WeldRecord};

/// 主数据表头（与生产数据一致）
pub const MAIN_HEADER: &str =
    "Дата,Номер заказа,№Днища,Сварщик,Длина сварных швов,ИТОГО проволока,Раскрой,Проволока,Диаметр,Толщина";

/// 缺陷数据表头
pub const DEFECT_HEADER: &str =
    "Номер заказа,№ Днища,Технологическая операция,Дата выяв-ния несоответствия";

pub const PRIMARY_REJECTION: &str = "Предъявление продукции";
pub const REWORK: &str = "Исправление повторное";

/// 写入临时 CSV 文件（保持 NamedTempFile 存活）
pub fn write_temp_csv(content: &str) -> Result<NamedTempFile, Box<dyn Error>> {
    let mut file = tempfile::Builder::new().suffix(".csv").tempfile()?;
    file.write_all(content.as_bytes())?;
    file.flush()?;
    Ok(file)
}

/// 创建临时配置库路径
pub fn create_test_db() -> Result<(NamedTempFile, String), Box<dyn Error>> {
    let temp_file = tempfile::Builder::new().suffix(".db").tempfile()?;
    let db_path = temp_file.path().to_string_lossy().to_string();
    Ok((temp_file, db_path))
}

/// 由行拼接 CSV 文本
pub fn csv_text(header: &str, rows: &[String]) -> String {
    let mut text = String::from(header);
    text.push('\n');
    for row in rows {
        text.push_str(row);
        text.push('\n');
    }
    text
}

/// 主数据行: 日期, 订单, 封头, 焊工, 长度(mm), 焊丝, 下料, 焊丝牌号
pub fn main_row(
    date: &str,
    order: &str,
    component: &str,
    welder: &str,
    length_mm: u32,
    wire: f64,
    cutting: &str,
    wire_material: &str,
) -> String {
    format!(
        "{},{},{},{},{},{},{},{},12,8",
        date, order, component, welder, length_mm, wire, cutting, wire_material
    )
}

pub fn defect_row(order: &str, component: &str, stage: &str, date: &str) -> String {
    format!("{},{},{},{}", order, component, stage, date)
}

// ==========================================
// 记录构建器
// ==========================================

pub struct WeldRecordBuilder {
    record: WeldRecord,
}

impl WeldRecordBuilder {
    pub fn new(welder: &str) -> Self {
        Self {
            record: WeldRecord {
                row_number: 2,
                date: None,
                order_id: None,
                component_id: None,
                welder_name: Some(welder.to_string()),
                welder_normalized: welder.to_uppercase(),
                weld_length_m: 0.0,
                wire_total: 0.0,
                diameter: None,
                thickness: None,
                cutting_type: None,
                wire_material: None,
                cells: HashMap::new(),
            },
        }
    }

    pub fn date(mut self, date: &str) -> Self {
        self.record.date = WeldDate::parse(date);
        self
    }

    pub fn component(mut self, order: &str, component: &str) -> Self {
        self.record.order_id = Some(order.to_string()).filter(|s| !s.is_empty());
        self.record.component_id = Some(component.to_string()).filter(|s| !s.is_empty());
        self
    }

    pub fn length(mut self, meters: f64) -> Self {
        self.record.weld_length_m = meters;
        self
    }

    pub fn wire_total(mut self, wire: f64) -> Self {
        self.record.wire_total = wire;
        self.record
            .cells
            .insert("WireTotal".to_string(), CellValue::Float(wire));
        self
    }

    pub fn cutting(mut self, cutting: &str) -> Self {
        self.record.cutting_type = Some(cutting.to_string());
        self
    }

    pub fn wire_material(mut self, material: &str) -> Self {
        self.record.wire_material = Some(material.to_string());
        self
    }

    pub fn build(self) -> WeldRecord {
        self.record
    }
}

pub fn defect(order: &str, component: &str, stage: DefectStage) -> DefectRecord {
    DefectRecord {
        row_number: 2,
        order_id: Some(order.to_string()).filter(|s| !s.is_empty()),
        component_id: Some(component.to_string()).filter(|s| !s.is_empty()),
        stage_label: Some(stage.label().to_string()),
        stage,
        detection_date: None,
        executor_normalized: None,
        cells: HashMap::new(),
    }
}
