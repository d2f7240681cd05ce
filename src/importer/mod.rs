// ==========================================
// 焊接生产分析看板 - 导入层
// ==========================================
// 职责: 外部数据获取与归一化，生成不可变快照
// 支持: CSV, Excel
// ==========================================

// 模块声明
pub mod data_cleaner;
pub mod data_loader;
pub mod dq_validator;
pub mod error;
pub mod field_mapper;
pub mod file_parser;
pub mod importer_trait;
pub mod record_normalizer;

// 重导出核心类型
pub use data_cleaner::DataCleaner;
pub use data_loader::{CsvTextSource, DataLoader, DataSnapshot, FileDataSource};
pub use dq_validator::{DqReport, DqSummary, DqValidator};
pub use error::{ImportError, ImportResult};
pub use field_mapper::{ColumnKind, ColumnSchema, FieldMapper, LogicalField, ResolvedColumns};
pub use file_parser::{CsvParser, ExcelParser, RawRow, RawTable, UniversalFileParser};
pub use record_normalizer::{normalize, normalize_defects, RecordNormalizer};

// 重导出 Trait 接口
pub use importer_trait::{DataSource, FileParser};
