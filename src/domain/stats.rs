// ==========================================
// 焊接生产分析看板 - 焊工统计模型
// ==========================================
// 用途: 聚合引擎独占输出，每次筛选/规则变更后重算，不持久化
// ==========================================

use serde::{Deserialize, Serialize};

/// 每个缺陷的扣分
pub const PENALTY_PER_DEFECT: f64 = 10.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WelderStats {
    pub welder: String,

    // ===== 累计量 =====
    pub total: usize,             // 作业次数
    pub total_length: f64,        // 焊缝总长（米）
    pub weighted_total: f64,      // 加权长度
    pub unique_components: usize, // 去重封头数
    pub unique_shift_dates: usize, // 去重班次（日期）数

    // ===== 派生指标 =====
    pub defect_count: usize,
    pub defect_rate: f64,          // %，1 位小数
    pub avg_length: f64,           // 每次作业平均长度，2 位小数
    pub avg_length_per_shift: f64, // 每班平均长度，2 位小数
    pub score: f64,                // 加权长度 - 缺陷数 × 扣分
}

impl WelderStats {
    pub fn empty(welder: impl Into<String>) -> Self {
        Self {
            welder: welder.into(),
            total: 0,
            total_length: 0.0,
            weighted_total: 0.0,
            unique_components: 0,
            unique_shift_dates: 0,
            defect_count: 0,
            defect_rate: 0.0,
            avg_length: 0.0,
            avg_length_per_shift: 0.0,
            score: 0.0,
        }
    }
}

/// 四舍五入到指定小数位
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// 安全除法：分母为 0 时返回 0
pub fn ratio_or_zero(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        0.0
    } else {
        numerator / denominator
    }
}
