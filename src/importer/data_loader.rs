// ==========================================
// 焊接生产分析看板 - 数据加载器
// ==========================================
// 职责: 获取两个数据集 → 归一化 → 生成不可变快照
// 失败策略:
// - 主数据集获取失败或为空 → 致命错误（调用方保留旧快照）
// - 缺陷数据集获取失败 → 告警并降级（defects = None）
// ==========================================

use crate::domain::weld::{DefectRecord, NormalizedDataset, WeldRecord};
use crate::importer::dq_validator::DqReport;
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::file_parser::{CsvParser, RawTable, UniversalFileParser};
use crate::importer::importer_trait::DataSource;
use crate::importer::record_normalizer::RecordNormalizer;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::path::PathBuf;
use tracing::{info, instrument, warn};
use uuid::Uuid;

// ==========================================
// DataSnapshot - 一次加载的完整结果
// ==========================================
#[derive(Debug, Clone)]
pub struct DataSnapshot {
    pub load_id: Uuid,
    pub loaded_at: DateTime<Utc>,
    pub source: String,
    pub weld: NormalizedDataset<WeldRecord>,
    pub defects: Option<NormalizedDataset<DefectRecord>>,
    pub reports: Vec<DqReport>,
}

impl DataSnapshot {
    /// 是否存在可用的缺陷数据（决定关联模式）
    pub fn has_defect_data(&self) -> bool {
        self.defects.as_ref().is_some_and(|d| !d.is_empty())
    }

    pub fn defect_records(&self) -> &[DefectRecord] {
        self.defects
            .as_ref()
            .map(|d| d.records.as_slice())
            .unwrap_or(&[])
    }

    pub fn warning_count(&self) -> usize {
        self.reports.iter().map(|r| r.summary.dropped).sum()
    }
}

// ==========================================
// FileDataSource - 本地文件来源 (.csv/.xlsx/.xls)
// ==========================================
#[derive(Debug, Clone)]
pub struct FileDataSource {
    main_path: PathBuf,
    defect_path: Option<PathBuf>,
}

impl FileDataSource {
    pub fn new(main_path: impl Into<PathBuf>, defect_path: Option<PathBuf>) -> Self {
        Self {
            main_path: main_path.into(),
            defect_path,
        }
    }

    /// 解析在阻塞线程池中执行
    async fn parse_file(path: PathBuf) -> ImportResult<RawTable> {
        tokio::task::spawn_blocking(move || UniversalFileParser.parse(&path))
            .await
            .map_err(|e| ImportError::InternalError(format!("解析任务异常: {}", e)))?
    }
}

#[async_trait]
impl DataSource for FileDataSource {
    async fn fetch_main(&self) -> ImportResult<RawTable> {
        Self::parse_file(self.main_path.clone()).await
    }

    async fn fetch_defects(&self) -> ImportResult<Option<RawTable>> {
        match &self.defect_path {
            Some(path) => Self::parse_file(path.clone()).await.map(Some),
            None => Ok(None),
        }
    }

    fn describe(&self) -> String {
        match &self.defect_path {
            Some(defects) => format!(
                "file:{} + file:{}",
                self.main_path.display(),
                defects.display()
            ),
            None => format!("file:{}", self.main_path.display()),
        }
    }
}

// ==========================================
// CsvTextSource - 已获取的 CSV 文本（网络来源由外部下载）
// ==========================================
#[derive(Debug, Clone)]
pub struct CsvTextSource {
    main_csv: String,
    defect_csv: Option<String>,
}

impl CsvTextSource {
    pub fn new(main_csv: impl Into<String>, defect_csv: Option<String>) -> Self {
        Self {
            main_csv: main_csv.into(),
            defect_csv,
        }
    }
}

#[async_trait]
impl DataSource for CsvTextSource {
    async fn fetch_main(&self) -> ImportResult<RawTable> {
        CsvParser.parse_str(&self.main_csv)
    }

    async fn fetch_defects(&self) -> ImportResult<Option<RawTable>> {
        self.defect_csv
            .as_deref()
            .map(|text| CsvParser.parse_str(text))
            .transpose()
    }

    fn describe(&self) -> String {
        "csv-text".to_string()
    }
}

// ==========================================
// DataLoader
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct DataLoader {
    normalizer: RecordNormalizer,
}

impl DataLoader {
    pub fn new(normalizer: RecordNormalizer) -> Self {
        Self { normalizer }
    }

    /// 并发获取两个数据集并归一化
    ///
    /// # 返回
    /// - Ok(DataSnapshot): 主数据集至少有一条有效记录
    /// - Err: 主数据集获取失败，或归一化后为空
    #[instrument(skip(self, source), fields(source = %source.describe()))]
    pub async fn load(&self, source: &dyn DataSource) -> ImportResult<DataSnapshot> {
        let (main, defects) =
            futures::future::join(source.fetch_main(), source.fetch_defects()).await;

        let main = main?;
        let weld = self.normalizer.normalize_weld(&main);
        if weld.is_empty() {
            return Err(ImportError::EmptyDataset(format!(
                "主数据集无有效记录 ({} 行被丢弃)",
                weld.warnings.len()
            )));
        }

        let defects = match defects {
            Ok(Some(table)) => Some(self.normalizer.normalize_defects(&table)),
            Ok(None) => None,
            Err(e) => {
                warn!(error = %e, "缺陷数据集获取失败，降级为规则模式");
                None
            }
        };

        let mut reports = vec![self.normalizer.report("main", &weld)];
        if let Some(d) = &defects {
            reports.push(self.normalizer.report("defects", d));
        }

        let snapshot = DataSnapshot {
            load_id: Uuid::new_v4(),
            loaded_at: Utc::now(),
            source: source.describe(),
            weld,
            defects,
            reports,
        };

        info!(
            load_id = %snapshot.load_id,
            weld_rows = snapshot.weld.len(),
            defect_rows = snapshot.defect_records().len(),
            dropped = snapshot.warning_count(),
            "数据加载完成"
        );

        Ok(snapshot)
    }
}
