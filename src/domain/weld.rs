// ==========================================
// 焊接生产分析看板 - 焊接作业/缺陷记录模型
// ==========================================
// 用途: 归一化层写入，引擎层只读
// 生命周期: 每次加载生成一次，重载时整体替换
// ==========================================

use crate::domain::types::{CellValue, DefectStage, WeldDate};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// 组合键分隔符：订单号 + "_" + 封头号
pub const KEY_SEPARATOR: &str = "_";

/// 焊工姓名缺失时的占位值
pub const UNKNOWN_WELDER: &str = "Unknown";

/// 构建组合键（任一部分为空 → None，永不匹配）
pub fn component_key(order_id: Option<&str>, component_id: Option<&str>) -> Option<String> {
    let order = order_id.map(str::trim).filter(|s| !s.is_empty())?;
    let component = component_id.map(str::trim).filter(|s| !s.is_empty())?;
    Some(format!("{}{}{}", order, KEY_SEPARATOR, component))
}

// ==========================================
// WeldRecord - 单次焊接作业
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeldRecord {
    // ===== 元信息 =====
    pub row_number: usize, // 源文件行号（表头为第 1 行）

    // ===== 日期 =====
    pub date: Option<WeldDate>, // 作业日期（空 → None）

    // ===== 关联键 =====
    pub order_id: Option<String>,     // 订单号
    pub component_id: Option<String>, // 封头号

    // ===== 焊工 =====
    pub welder_name: Option<String>, // 原始姓名
    pub welder_normalized: String,   // 归一化姓名（空 → Unknown）

    // ===== 工艺数值 =====
    pub weld_length_m: f64,          // 焊缝长度（米，源数据毫米 / 1000）
    pub wire_total: f64,             // 焊丝合计
    pub diameter: Option<CellValue>, // 直径（原始单元格，供筛选）
    pub thickness: Option<CellValue>, // 厚度（原始单元格，供筛选）

    // ===== 分类字段 =====
    pub cutting_type: Option<String>,  // 下料方式（首字母决定复杂度系数）
    pub wire_material: Option<String>, // 焊丝牌号（决定材料系数）

    // ===== 全部列（按表头名） =====
    pub cells: HashMap<String, CellValue>,
}

impl WeldRecord {
    pub fn component_key(&self) -> Option<String> {
        component_key(self.order_id.as_deref(), self.component_id.as_deref())
    }

    /// 直径数值（解析失败为 0）
    pub fn diameter_value(&self) -> f64 {
        self.diameter.as_ref().map(CellValue::lenient_f64).unwrap_or(0.0)
    }

    /// 厚度数值（解析失败为 0）
    pub fn thickness_value(&self) -> f64 {
        self.thickness.as_ref().map(CellValue::lenient_f64).unwrap_or(0.0)
    }

    /// 按表头名取列值
    pub fn cell(&self, column: &str) -> Option<&CellValue> {
        self.cells.get(column)
    }
}

// ==========================================
// DefectRecord - 单条质量事件
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefectRecord {
    pub row_number: usize,

    // ===== 关联键 =====
    pub order_id: Option<String>,
    pub component_id: Option<String>,

    // ===== 工序 =====
    pub stage: DefectStage,
    pub stage_label: Option<String>, // 原始工序标签

    // ===== 发现日期 =====
    pub detection_date: Option<WeldDate>,

    // ===== 责任人 =====
    pub executor_normalized: Option<String>,

    pub cells: HashMap<String, CellValue>,
}

impl DefectRecord {
    pub fn component_key(&self) -> Option<String> {
        component_key(self.order_id.as_deref(), self.component_id.as_deref())
    }
}

// ==========================================
// 行级告警（行被丢弃的原因）
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowWarning {
    pub row_number: usize,
    pub field: Option<String>,
    pub message: String,
}

// ==========================================
// 归一化结果
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizedDataset<T> {
    pub records: Vec<T>,
    pub headers: Vec<String>,
    pub warnings: Vec<RowWarning>,
}

impl<T> NormalizedDataset<T> {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
