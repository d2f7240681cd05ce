// ==========================================
// 焊接生产分析看板 - 缺陷关联索引
// ==========================================
// 职责: (订单号, 封头号) 组合键 → 判废/返修是否存在
// 构建: 每次加载（或筛选后）全量重建，不做增量更新
// 红线: 任一关联键为空的记录永不匹配
// ==========================================

use crate::domain::types::DefectStage;
use crate::domain::weld::{DefectRecord, WeldRecord};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use tracing::{debug, instrument};

#[derive(Debug, Clone, Default, Serialize)]
pub struct DefectLinkageIndex {
    rejection_keys: HashSet<String>,
    rework_keys: HashSet<String>,
    stage_keys: HashMap<String, HashSet<String>>, // 工序标签 → 组合键
}

impl DefectLinkageIndex {
    /// 组合键是否被首次提交判废
    pub fn contains_rejection(&self, key: &str) -> bool {
        self.rejection_keys.contains(key)
    }

    pub fn contains_rework(&self, key: &str) -> bool {
        self.rework_keys.contains(key)
    }

    /// 该焊接作业对应的封头是否判废
    pub fn is_defective(&self, record: &WeldRecord) -> bool {
        record
            .component_key()
            .is_some_and(|key| self.rejection_keys.contains(&key))
    }

    /// 该焊接作业对应的封头是否返修
    pub fn is_reworked(&self, record: &WeldRecord) -> bool {
        record
            .component_key()
            .is_some_and(|key| self.rework_keys.contains(&key))
    }

    pub fn rejection_count(&self) -> usize {
        self.rejection_keys.len()
    }

    pub fn rework_count(&self) -> usize {
        self.rework_keys.len()
    }

    /// 按工序标签划分的组合键
    pub fn stage_keys(&self, label: &str) -> Option<&HashSet<String>> {
        self.stage_keys.get(label)
    }

    pub fn is_empty(&self) -> bool {
        self.rejection_keys.is_empty() && self.rework_keys.is_empty()
    }
}

/// 由缺陷记录构建关联索引
#[instrument(skip(defects), fields(count = defects.len()))]
pub fn build_linkage_index(defects: &[DefectRecord]) -> DefectLinkageIndex {
    let mut index = DefectLinkageIndex::default();

    for defect in defects {
        let Some(key) = defect.component_key() else {
            continue;
        };

        match &defect.stage {
            DefectStage::PrimaryRejection => {
                index.rejection_keys.insert(key.clone());
            }
            DefectStage::Rework => {
                index.rework_keys.insert(key.clone());
            }
            DefectStage::Other(_) | DefectStage::Unspecified => {}
        }

        index
            .stage_keys
            .entry(defect.stage.label().to_string())
            .or_default()
            .insert(key);
    }

    debug!(
        rejection = index.rejection_keys.len(),
        rework = index.rework_keys.len(),
        "缺陷关联索引构建完成"
    );

    index
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn defect(order: &str, component: &str, stage: DefectStage) -> DefectRecord {
        DefectRecord {
            row_number: 2,
            order_id: Some(order.to_string()).filter(|s| !s.is_empty()),
            component_id: Some(component.to_string()).filter(|s| !s.is_empty()),
            stage,
            stage_label: None,
            detection_date: None,
            executor_normalized: None,
            cells: HashMap::new(),
        }
    }

    fn weld(order: Option<&str>, component: Option<&str>) -> WeldRecord {
        WeldRecord {
            row_number: 2,
            date: None,
            order_id: order.map(str::to_string),
            component_id: component.map(str::to_string),
            welder_name: None,
            welder_normalized: "IVANOV".to_string(),
            weld_length_m: 1.0,
            wire_total: 0.0,
            diameter: None,
            thickness: None,
            cutting_type: None,
            wire_material: None,
            cells: HashMap::new(),
        }
    }

    #[test]
    fn test_build_separates_rejection_and_rework() {
        let index = build_linkage_index(&[
            defect("A", "1", DefectStage::PrimaryRejection),
            defect("A", "2", DefectStage::Rework),
            defect("A", "3", DefectStage::Other("Штамповка".to_string())),
        ]);

        assert!(index.contains_rejection("A_1"));
        assert!(!index.contains_rejection("A_2"));
        assert!(index.contains_rework("A_2"));
        assert_eq!(index.rejection_count(), 1);
        assert_eq!(index.rework_count(), 1);
        assert!(index.stage_keys("Штамповка").unwrap().contains("A_3"));
    }

    #[test]
    fn test_build_skips_rows_without_keys() {
        let index = build_linkage_index(&[
            defect("", "1", DefectStage::PrimaryRejection),
            defect("A", "", DefectStage::PrimaryRejection),
        ]);
        assert!(index.is_empty());
    }

    #[test]
    fn test_query_with_missing_key_is_false() {
        let index = build_linkage_index(&[defect("A", "1", DefectStage::PrimaryRejection)]);

        assert!(index.is_defective(&weld(Some("A"), Some("1"))));
        assert!(index.is_defective(&weld(Some(" A "), Some("1"))));
        assert!(!index.is_defective(&weld(None, Some("1"))));
        assert!(!index.is_defective(&weld(Some("A"), None)));
        assert!(!index.is_reworked(&weld(Some("A"), Some("1"))));
    }
}
