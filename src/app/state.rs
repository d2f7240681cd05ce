// ==========================================
// 焊接生产分析看板 - 分析会话
// ==========================================
// 职责: 持有当前快照 + 筛选条件 + 派生结果，调用方独占
// 规则:
// - 快照不可变，重载时整体替换；重载失败保留旧快照
// - 筛选/规则变更失败时状态不变
// - 关联模式每次派生时显式确定: 有缺陷数据 → RealData，否则 RuleBased
// ==========================================

use crate::domain::types::{AggType, Period};
use crate::domain::weld::{DefectRecord, WeldRecord};
use crate::engine::defect_classifier::{
    classify_defects, rework_incidence, DefectBreakdown, DefectRule, LinkageMode, ReworkIncidence,
};
use crate::engine::filter::{filter, filter_defects, FilterError, FilterSpec};
use crate::engine::kpi_summary::{
    defect_summary, kpi_summary, monthly_trend_card, DefectSummary, KpiSummary, KpiTargets,
    MonthlyTrendCard,
};
use crate::engine::linkage::build_linkage_index;
use crate::engine::trend::{compute_trend, welder_series, MetricField, TrendSeries, WelderSeries};
use crate::engine::welder_metrics::{
    compute_welder_stats, welder_defect_shares, WelderDefectShare, WelderTable,
};
use crate::importer::data_loader::{DataLoader, DataSnapshot};
use crate::importer::error::ImportError;
use crate::importer::importer_trait::DataSource;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, instrument, warn};

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("筛选条件无效: {0}")]
    Filter(#[from] FilterError),

    #[error("数据加载失败: {0}")]
    Load(#[from] ImportError),
}

/// 一次派生的结果（提交前全部计算完成）
struct Derived {
    filtered: Vec<WeldRecord>,
    filtered_defects: Vec<DefectRecord>,
    mode: LinkageMode,
}

fn derive(
    snapshot: &DataSnapshot,
    spec: &FilterSpec,
    rule: &DefectRule,
) -> Result<Derived, FilterError> {
    let filtered = filter(&snapshot.weld.records, spec)?;
    let range = spec.date_range()?;
    let filtered_defects = filter_defects(snapshot.defect_records(), &range);

    let mode = if snapshot.has_defect_data() {
        LinkageMode::RealData(build_linkage_index(&filtered_defects))
    } else {
        LinkageMode::RuleBased(rule.clone())
    };

    Ok(Derived {
        filtered,
        filtered_defects,
        mode,
    })
}

// ==========================================
// AnalyticsSession
// ==========================================
pub struct AnalyticsSession {
    loader: DataLoader,
    snapshot: Arc<DataSnapshot>,
    spec: FilterSpec,
    rule: DefectRule,
    targets: KpiTargets,

    // ===== 派生状态 =====
    filtered: Vec<WeldRecord>,
    filtered_defects: Vec<DefectRecord>,
    mode: LinkageMode,
}

impl AnalyticsSession {
    /// 由已加载的快照创建会话（无筛选）
    pub fn new(snapshot: DataSnapshot, rule: DefectRule, targets: KpiTargets) -> Self {
        Self::with_loader(DataLoader::default(), snapshot, rule, targets)
    }

    pub fn with_loader(
        loader: DataLoader,
        snapshot: DataSnapshot,
        rule: DefectRule,
        targets: KpiTargets,
    ) -> Self {
        let mode = if snapshot.has_defect_data() {
            LinkageMode::RealData(build_linkage_index(snapshot.defect_records()))
        } else {
            LinkageMode::RuleBased(rule.clone())
        };

        info!(
            load_id = %snapshot.load_id,
            records = snapshot.weld.len(),
            mode = %mode.label(),
            "分析会话已创建"
        );

        Self {
            loader,
            filtered: snapshot.weld.records.clone(),
            filtered_defects: snapshot.defect_records().to_vec(),
            snapshot: Arc::new(snapshot),
            spec: FilterSpec::default(),
            rule,
            targets,
            mode,
        }
    }

    /// 从数据来源加载并创建会话
    pub async fn open(
        loader: DataLoader,
        source: &dyn DataSource,
        rule: DefectRule,
        targets: KpiTargets,
    ) -> Result<Self, SessionError> {
        let snapshot = loader.load(source).await?;
        Ok(Self::with_loader(loader, snapshot, rule, targets))
    }

    // ==========================================
    // 状态变更
    // ==========================================

    /// 应用筛选条件
    ///
    /// # 返回
    /// - Ok(usize): 筛选后的作业数
    /// - Err: 日期输入非法，当前视图不变
    #[instrument(skip(self, spec))]
    pub fn apply_filter(&mut self, spec: FilterSpec) -> Result<usize, SessionError> {
        let derived = derive(&self.snapshot, &spec, &self.rule).map_err(|e| {
            warn!(error = %e, "筛选被拒绝");
            e
        })?;

        self.commit(derived);
        self.spec = spec;
        Ok(self.filtered.len())
    }

    /// 清空筛选条件
    pub fn reset_filters(&mut self) {
        // 空条件不会产生日期错误
        if let Ok(derived) = derive(&self.snapshot, &FilterSpec::default(), &self.rule) {
            self.commit(derived);
            self.spec = FilterSpec::default();
        }
    }

    /// 更新缺陷规则；真实数据模式下仅保存，不影响判定
    pub fn set_defect_rule(&mut self, rule: DefectRule) {
        if let LinkageMode::RuleBased(current) = &mut self.mode {
            *current = rule.clone();
        }
        self.rule = rule;
    }

    pub fn set_kpi_targets(&mut self, targets: KpiTargets) {
        self.targets = targets;
    }

    /// 重新加载两个数据集
    ///
    /// 成功: 整体替换快照并按当前筛选条件重算
    /// 失败: 返回错误，旧快照与派生结果保持不变
    #[instrument(skip(self, source))]
    pub async fn reload(&mut self, source: &dyn DataSource) -> Result<(), SessionError> {
        let snapshot = match self.loader.load(source).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(error = %e, "重新加载失败，保留旧快照");
                return Err(e.into());
            }
        };

        let derived = derive(&snapshot, &self.spec, &self.rule)?;
        self.snapshot = Arc::new(snapshot);
        self.commit(derived);

        info!(
            load_id = %self.snapshot.load_id,
            filtered = self.filtered.len(),
            "重新加载完成"
        );
        Ok(())
    }

    fn commit(&mut self, derived: Derived) {
        self.filtered = derived.filtered;
        self.filtered_defects = derived.filtered_defects;
        self.mode = derived.mode;
    }

    // ==========================================
    // 只读访问
    // ==========================================

    pub fn snapshot(&self) -> Arc<DataSnapshot> {
        Arc::clone(&self.snapshot)
    }

    pub fn filter_spec(&self) -> &FilterSpec {
        &self.spec
    }

    pub fn defect_rule(&self) -> &DefectRule {
        &self.rule
    }

    pub fn kpi_targets(&self) -> &KpiTargets {
        &self.targets
    }

    pub fn mode(&self) -> &LinkageMode {
        &self.mode
    }

    pub fn records(&self) -> &[WeldRecord] {
        &self.filtered
    }

    pub fn defects(&self) -> &[DefectRecord] {
        &self.filtered_defects
    }

    pub fn headers(&self) -> &[String] {
        &self.snapshot.weld.headers
    }

    // ==========================================
    // 指标
    // ==========================================

    pub fn welder_stats(&self) -> WelderTable {
        compute_welder_stats(&self.filtered, &self.mode)
    }

    pub fn welder_defect_shares(&self) -> Vec<WelderDefectShare> {
        welder_defect_shares(&self.filtered, &self.mode)
    }

    pub fn trend(&self, field: &MetricField, period: Period, agg: AggType) -> TrendSeries {
        compute_trend(&self.filtered, field, period, agg)
    }

    pub fn welder_series(&self, period: Period) -> WelderSeries {
        welder_series(&self.filtered, period)
    }

    pub fn kpi_summary(&self) -> KpiSummary {
        kpi_summary(&self.filtered, &self.mode, &self.targets)
    }

    pub fn defect_summary(&self) -> DefectSummary {
        defect_summary(&self.filtered, &self.mode, &self.targets)
    }

    pub fn monthly_trend(&self) -> Option<MonthlyTrendCard> {
        monthly_trend_card(&self.filtered, &self.targets)
    }

    pub fn defect_breakdown(&self) -> DefectBreakdown {
        classify_defects(&self.filtered_defects)
    }

    /// 返修发生率（仅真实数据模式）
    pub fn rework_incidence(&self) -> Option<Vec<ReworkIncidence>> {
        match &self.mode {
            LinkageMode::RealData(index) => Some(rework_incidence(&self.filtered, index)),
            LinkageMode::RuleBased(_) => None,
        }
    }
}

/// 获取默认配置数据库路径
///
/// 优先级: 环境变量 WELD_ANALYTICS_DB_PATH → 用户数据目录 → 当前目录
pub fn get_default_db_path() -> String {
    use std::path::PathBuf;

    if let Ok(path) = std::env::var("WELD_ANALYTICS_DB_PATH") {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let mut path = PathBuf::from("./weld_analytics.db");

    if let Some(data_dir) = dirs::data_dir() {
        let dir = data_dir.join("weld-analytics");
        if std::fs::create_dir_all(&dir).is_ok() {
            path = dir.join("weld_analytics.db");
        }
    }

    path.to_string_lossy().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::importer::data_loader::CsvTextSource;

    const MAIN: &str = "Дата,Номер заказа,№Днища,Сварщик,Длина сварных швов,ИТОГО проволока\n\
                        15.01.2024,З-1,1,Иванов,2000,0\n\
                        15.02.2024,З-1,2,Петров,3000,5\n";

    const DEFECTS: &str = "Номер заказа,№ Днища,Технологическая операция,Дата выяв-ния несоответствия\n\
                           З-1,1,Предъявление продукции,20.01.2024\n\
                           З-1,2,Предъявление продукции,20.02.2024\n";

    async fn session(defects: Option<&str>) -> AnalyticsSession {
        let source = CsvTextSource::new(MAIN, defects.map(str::to_string));
        AnalyticsSession::open(
            DataLoader::default(),
            &source,
            DefectRule::default(),
            KpiTargets::default(),
        )
        .await
        .unwrap()
    }

    #[test]
    fn test_get_default_db_path() {
        let path = get_default_db_path();
        assert!(!path.is_empty());
        assert!(path.ends_with(".db"));
    }

    #[tokio::test]
    async fn test_mode_follows_defect_data() {
        assert!(session(Some(DEFECTS)).await.mode().is_real_data());
        assert!(!session(None).await.mode().is_real_data());
    }

    #[tokio::test]
    async fn test_invalid_filter_leaves_state_unchanged() {
        let mut s = session(Some(DEFECTS)).await;
        s.apply_filter(FilterSpec {
            welder: Some("иванов".to_string()),
            ..FilterSpec::default()
        })
        .unwrap();
        assert_eq!(s.records().len(), 1);

        let err = s.apply_filter(FilterSpec {
            date_from: Some("32.13.2024".to_string()),
            ..FilterSpec::default()
        });

        assert!(matches!(err, Err(SessionError::Filter(_))));
        assert_eq!(s.records().len(), 1);
        assert_eq!(s.filter_spec().welder.as_deref(), Some("иванов"));
    }

    #[tokio::test]
    async fn test_date_filter_rebuilds_linkage_from_period_defects() {
        let mut s = session(Some(DEFECTS)).await;
        assert_eq!(s.welder_stats().total_defects(), 2);

        s.apply_filter(FilterSpec {
            date_from: Some("01.01.2024".to_string()),
            date_to: Some("31.01.2024".to_string()),
            ..FilterSpec::default()
        })
        .unwrap();

        assert_eq!(s.records().len(), 1);
        assert_eq!(s.defects().len(), 1);
        assert_eq!(s.welder_stats().total_defects(), 1);

        s.reset_filters();
        assert_eq!(s.records().len(), 2);
    }

    #[tokio::test]
    async fn test_set_defect_rule_in_rule_mode() {
        let mut s = session(None).await;
        assert_eq!(s.kpi_summary().defect_count, 1);

        s.set_defect_rule(DefectRule::parse("ИТОГО проволока", ">", "1").unwrap());

        assert_eq!(s.kpi_summary().defect_count, 1);
        assert_eq!(s.defect_summary().top_welders[0].0, "ПЕТРОВ");
        assert!(s.rework_incidence().is_none());
    }

    #[tokio::test]
    async fn test_reload_failure_keeps_snapshot() {
        let mut s = session(Some(DEFECTS)).await;
        let before = s.snapshot().load_id;

        let bad = CsvTextSource::new("Дата,Сварщик\n", None);
        assert!(s.reload(&bad).await.is_err());
        assert_eq!(s.snapshot().load_id, before);
        assert!(s.mode().is_real_data());

        let good = CsvTextSource::new(MAIN, None);
        s.reload(&good).await.unwrap();
        assert_ne!(s.snapshot().load_id, before);
        assert!(!s.mode().is_real_data());
    }
}
