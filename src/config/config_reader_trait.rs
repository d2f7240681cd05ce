// ==========================================
// 焊接生产分析看板 - 看板配置读取 Trait
// ==========================================
// 职责: 定义看板会话所需的配置读取接口（不包含实现）
// 红线: 不包含配置写入、不包含业务逻辑
// ==========================================

use crate::config::config_manager::ConfigResult;
use crate::config::dashboard_config::DataSourceConfig;
use crate::domain::types::NameCase;
use crate::engine::defect_classifier::DefectRule;
use crate::engine::kpi_summary::KpiTargets;
use async_trait::async_trait;

// ==========================================
// DashboardConfigReader Trait
// ==========================================
// 用途: 会话初始化时读取数据来源、缺陷规则、KPI 目标
// 实现者: ConfigManager（从 config_kv 表读取）
#[async_trait]
pub trait DashboardConfigReader: Send + Sync {
    /// 获取数据来源配置
    ///
    /// # 返回
    /// - Some: 已配置主数据路径
    /// - None: 未配置
    async fn get_data_source_config(&self) -> ConfigResult<Option<DataSourceConfig>>;

    /// 获取缺陷判定规则（无缺陷数据时使用）
    ///
    /// # 默认值
    /// - ИТОГО проволока = 0
    async fn get_defect_rule(&self) -> ConfigResult<DefectRule>;

    /// 获取 KPI 目标
    ///
    /// # 默认值
    /// - 缺陷率 5%，每班 30 米，月度 900 米
    async fn get_kpi_targets(&self) -> ConfigResult<KpiTargets>;

    /// 获取姓名大小写方式
    ///
    /// # 默认值
    /// - 大写
    async fn get_name_case(&self) -> ConfigResult<NameCase>;
}
