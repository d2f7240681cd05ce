// ==========================================
// 焊接生产分析看板 - 数据来源配置
// ==========================================

use crate::config::config_manager::{ConfigError, ConfigResult};
use crate::importer::data_loader::FileDataSource;
use crate::importer::file_parser::UniversalFileParser;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// 主数据 + 缺陷数据的文件路径
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataSourceConfig {
    pub main_path: String,
    #[serde(default)]
    pub defect_path: Option<String>,
}

impl DataSourceConfig {
    pub fn new(main_path: impl Into<String>, defect_path: Option<String>) -> Self {
        Self {
            main_path: main_path.into(),
            defect_path,
        }
    }

    /// 校验: 主路径非空，扩展名受支持（csv/xlsx/xls）
    pub fn validate(&self) -> ConfigResult<()> {
        let main = self.main_path.trim();
        if main.is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "main_path".to_string(),
                message: "主数据路径不能为空".to_string(),
            });
        }
        check_extension("main_path", main)?;

        if let Some(defect) = self.defect_path.as_deref().map(str::trim) {
            if !defect.is_empty() {
                check_extension("defect_path", defect)?;
            }
        }
        Ok(())
    }

    pub fn to_data_source(&self) -> FileDataSource {
        FileDataSource::new(
            PathBuf::from(self.main_path.trim()),
            self.defect_path
                .as_deref()
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(PathBuf::from),
        )
    }
}

fn check_extension(key: &str, path: &str) -> ConfigResult<()> {
    if UniversalFileParser::is_supported(Path::new(path)) {
        Ok(())
    } else {
        Err(ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("文件格式不支持: {}", path),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_rejects_empty_and_unsupported() {
        assert!(DataSourceConfig::new("  ", None).validate().is_err());
        assert!(DataSourceConfig::new("main.txt", None).validate().is_err());
        assert!(DataSourceConfig::new("main.csv", Some("defects.json".to_string()))
            .validate()
            .is_err());
    }

    #[test]
    fn test_validate_accepts_supported_paths() {
        let config = DataSourceConfig::new("main.xlsx", Some(" ".to_string()));
        assert!(config.validate().is_ok());
        assert!(DataSourceConfig::new("main.csv", Some("brak.CSV".to_string()))
            .validate()
            .is_ok());
    }
}
