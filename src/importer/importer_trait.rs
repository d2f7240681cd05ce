// ==========================================
// 焊接生产分析看板 - 导入 Trait
// ==========================================
// 职责: 定义文件解析与数据源接口（不包含实现）
// ==========================================

use crate::importer::error::ImportResult;
use crate::importer::file_parser::RawTable;
use async_trait::async_trait;
use std::path::Path;

// ==========================================
// FileParser Trait
// ==========================================
// 用途: 文件解析接口
// 实现者: CsvParser, ExcelParser
pub trait FileParser: Send + Sync {
    /// 解析文件为原始表（有序表头 + 按位置的字符串行）
    ///
    /// # 返回
    /// - Ok(RawTable): 表头与数据行（完全空白的行已跳过）
    /// - Err: 文件不存在、格式不支持、解析失败
    fn parse_to_raw_table(&self, file_path: &Path) -> ImportResult<RawTable>;
}

// ==========================================
// DataSource Trait
// ==========================================
// 用途: 数据获取边界（唯一的异步边界）
// 实现者: FileDataSource；网络来源由外部实现
#[async_trait]
pub trait DataSource: Send + Sync {
    /// 获取主数据集（焊接作业）
    ///
    /// 失败即加载失败，调用方保留旧快照
    async fn fetch_main(&self) -> ImportResult<RawTable>;

    /// 获取缺陷数据集
    ///
    /// # 返回
    /// - Ok(Some): 缺陷表
    /// - Ok(None): 未配置缺陷来源
    /// - Err: 获取失败（加载器降级为规则模式，不视为致命错误）
    async fn fetch_defects(&self) -> ImportResult<Option<RawTable>>;

    /// 来源描述（用于日志）
    fn describe(&self) -> String;
}
