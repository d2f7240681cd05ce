// ==========================================
// 焊接生产分析看板 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、写入、快照/恢复
// 存储: config_kv 表 (scope_id + key → value)
// ==========================================

use crate::config::config_reader_trait::DashboardConfigReader;
use crate::config::dashboard_config::DataSourceConfig;
use crate::db::{configure_sqlite_connection, init_config_schema, open_sqlite_connection};
use crate::domain::types::NameCase;
use crate::engine::defect_classifier::DefectRule;
use crate::engine::kpi_summary::KpiTargets;
use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

// ==========================================
// ConfigError
// ==========================================
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("数据库错误: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("序列化错误: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("锁获取失败: {0}")]
    LockPoisoned(String),

    #[error("配置值无效 ({key}): {message}")]
    InvalidValue { key: String, message: String },
}

pub type ConfigResult<T> = Result<T, ConfigError>;

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例（自动建表）
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> ConfigResult<Self> {
        let conn = open_sqlite_connection(db_path)?;
        init_config_schema(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建 ConfigManager
    ///
    /// 会对传入连接再次应用统一 PRAGMA 并建表（幂等）
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> ConfigResult<Self> {
        {
            let guard = conn
                .lock()
                .map_err(|e| ConfigError::LockPoisoned(e.to_string()))?;
            configure_sqlite_connection(&guard)?;
            init_config_schema(&guard)?;
        }

        Ok(Self { conn })
    }

    fn lock(&self) -> ConfigResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| ConfigError::LockPoisoned(e.to_string()))
    }

    /// 读取 global scope 的配置值
    ///
    /// # 返回
    /// - Some(String): 配置值
    /// - None: 配置不存在
    pub fn get_global_config_value(&self, key: &str) -> ConfigResult<Option<String>> {
        let conn = self.lock()?;
        let value = conn
            .query_row(
                "SELECT value FROM config_kv WHERE scope_id = 'global' AND key = ?1",
                params![key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    /// 写入 global scope 的配置值（存在则覆盖）
    pub fn set_global_config_value(&self, key: &str, value: &str) -> ConfigResult<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO config_kv (scope_id, key, value, updated_at)
             VALUES ('global', ?1, ?2, datetime('now'))
             ON CONFLICT(scope_id, key) DO UPDATE SET value = ?2, updated_at = datetime('now')",
            params![key, value],
        )?;
        tracing::debug!(key, "配置已写入");
        Ok(())
    }

    /// 删除 global scope 的配置值
    pub fn remove_global_config_value(&self, key: &str) -> ConfigResult<bool> {
        let conn = self.lock()?;
        let affected = conn.execute(
            "DELETE FROM config_kv WHERE scope_id = 'global' AND key = ?1",
            params![key],
        )?;
        Ok(affected > 0)
    }

    /// 读取 JSON 配置；缺失或格式错误时返回默认值
    fn get_json_or_default<T: DeserializeOwned>(&self, key: &str, default: T) -> ConfigResult<T> {
        let Some(raw) = self.get_global_config_value(key)? else {
            return Ok(default);
        };

        match serde_json::from_str(&raw) {
            Ok(value) => Ok(value),
            Err(e) => {
                tracing::warn!(
                    config_key = key,
                    raw_value = %raw,
                    error = %e,
                    "配置格式错误，使用默认值"
                );
                Ok(default)
            }
        }
    }

    fn set_json<T: Serialize>(&self, key: &str, value: &T) -> ConfigResult<()> {
        let raw = serde_json::to_string(value)?;
        self.set_global_config_value(key, &raw)
    }

    /// 获取所有 global 配置的快照（JSON 格式）
    pub fn get_config_snapshot(&self) -> ConfigResult<String> {
        let conn = self.lock()?;

        let mut stmt =
            conn.prepare("SELECT key, value FROM config_kv WHERE scope_id = 'global' ORDER BY key")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut config_map: BTreeMap<String, String> = BTreeMap::new();
        for row in rows {
            let (key, value) = row?;
            config_map.insert(key, value);
        }

        Ok(serde_json::to_string(&json!(config_map))?)
    }

    /// 从配置快照恢复配置
    ///
    /// # 返回
    /// - Ok(usize): 恢复的配置项数量
    ///
    /// # 注意
    /// - 覆盖同名的 global 配置，不删除快照中不存在的键
    pub fn restore_config_from_snapshot(&self, snapshot_json: &str) -> ConfigResult<usize> {
        let config_map: BTreeMap<String, String> = serde_json::from_str(snapshot_json)?;

        let conn = self.lock()?;
        let tx = conn.unchecked_transaction()?;

        let mut count = 0;
        for (key, value) in &config_map {
            count += tx.execute(
                "INSERT INTO config_kv (scope_id, key, value, updated_at)
                 VALUES ('global', ?1, ?2, datetime('now'))
                 ON CONFLICT(scope_id, key) DO UPDATE SET value = ?2, updated_at = datetime('now')",
                params![key, value],
            )?;
        }

        tx.commit()?;
        Ok(count)
    }

    // ===== 看板配置写入 =====

    pub fn set_data_source_config(&self, config: &DataSourceConfig) -> ConfigResult<()> {
        config.validate()?;
        self.set_global_config_value(config_keys::MAIN_SOURCE_PATH, config.main_path.trim())?;
        match config.defect_path.as_deref().map(str::trim) {
            Some(path) if !path.is_empty() => {
                self.set_global_config_value(config_keys::DEFECT_SOURCE_PATH, path)
            }
            _ => self
                .remove_global_config_value(config_keys::DEFECT_SOURCE_PATH)
                .map(|_| ()),
        }
    }

    pub fn set_defect_rule(&self, rule: &DefectRule) -> ConfigResult<()> {
        if rule.field.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: config_keys::DEFECT_RULE.to_string(),
                message: "规则字段为空".to_string(),
            });
        }
        self.set_json(config_keys::DEFECT_RULE, rule)
    }

    pub fn set_kpi_targets(&self, targets: &KpiTargets) -> ConfigResult<()> {
        let values = [
            targets.defect_rate,
            targets.avg_length_per_shift,
            targets.monthly_target,
        ];
        if values.iter().any(|v| !v.is_finite() || *v < 0.0) {
            return Err(ConfigError::InvalidValue {
                key: config_keys::KPI_TARGETS.to_string(),
                message: "KPI 目标必须为非负数".to_string(),
            });
        }
        self.set_json(config_keys::KPI_TARGETS, targets)
    }

    pub fn set_name_case(&self, name_case: NameCase) -> ConfigResult<()> {
        self.set_json(config_keys::NAME_CASE, &name_case)
    }
}

// ==========================================
// DashboardConfigReader Trait 实现
// ==========================================
#[async_trait]
impl DashboardConfigReader for ConfigManager {
    async fn get_data_source_config(&self) -> ConfigResult<Option<DataSourceConfig>> {
        let Some(main_path) = self.get_global_config_value(config_keys::MAIN_SOURCE_PATH)? else {
            return Ok(None);
        };
        let defect_path = self.get_global_config_value(config_keys::DEFECT_SOURCE_PATH)?;
        Ok(Some(DataSourceConfig::new(main_path, defect_path)))
    }

    async fn get_defect_rule(&self) -> ConfigResult<DefectRule> {
        self.get_json_or_default(config_keys::DEFECT_RULE, DefectRule::default())
    }

    async fn get_kpi_targets(&self) -> ConfigResult<KpiTargets> {
        self.get_json_or_default(config_keys::KPI_TARGETS, KpiTargets::default())
    }

    async fn get_name_case(&self) -> ConfigResult<NameCase> {
        self.get_json_or_default(config_keys::NAME_CASE, NameCase::default())
    }
}

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    // 数据来源
    pub const MAIN_SOURCE_PATH: &str = "main_source_path";
    pub const DEFECT_SOURCE_PATH: &str = "defect_source_path";

    // 缺陷判定规则 (JSON)
    pub const DEFECT_RULE: &str = "defect_rule";

    // KPI 目标 (JSON)
    pub const KPI_TARGETS: &str = "kpi_targets";

    // 姓名大小写 (JSON)
    pub const NAME_CASE: &str = "name_case";
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> ConfigManager {
        let conn = Connection::open_in_memory().unwrap();
        ConfigManager::from_connection(Arc::new(Mutex::new(conn))).unwrap()
    }

    #[test]
    fn test_set_and_get_value() {
        let mgr = manager();
        assert_eq!(mgr.get_global_config_value("x").unwrap(), None);

        mgr.set_global_config_value("x", "1").unwrap();
        mgr.set_global_config_value("x", "2").unwrap();

        assert_eq!(mgr.get_global_config_value("x").unwrap().as_deref(), Some("2"));
        assert!(mgr.remove_global_config_value("x").unwrap());
        assert!(!mgr.remove_global_config_value("x").unwrap());
    }

    #[tokio::test]
    async fn test_invalid_json_falls_back_to_default() {
        let mgr = manager();
        mgr.set_global_config_value(config_keys::KPI_TARGETS, "{not json")
            .unwrap();

        assert_eq!(mgr.get_kpi_targets().await.unwrap(), KpiTargets::default());
        assert_eq!(mgr.get_defect_rule().await.unwrap(), DefectRule::default());
    }

    #[test]
    fn test_set_kpi_targets_rejects_negative() {
        let mgr = manager();
        let targets = KpiTargets {
            defect_rate: -1.0,
            ..KpiTargets::default()
        };
        assert!(matches!(
            mgr.set_kpi_targets(&targets),
            Err(ConfigError::InvalidValue { .. })
        ));
    }
}
