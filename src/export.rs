// ==========================================
// 焊接生产分析看板 - CSV 导出
// ==========================================
// 格式: UTF-8 BOM + 表头行 + 数据行
// 数值保留 2 位小数，文本一律加引号（内部引号双写），空值留空
// ==========================================

use crate::domain::types::CellValue;
use crate::domain::weld::WeldRecord;
use chrono::NaiveDate;
use csv::{QuoteStyle, WriterBuilder};
use std::io::Write;
use std::path::Path;
use thiserror::Error;
use tracing::{info, instrument};

const UTF8_BOM: &str = "\u{feff}";

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("CSV 写入失败: {0}")]
    Csv(#[from] csv::Error),

    #[error("文件写入失败: {0}")]
    Io(#[from] std::io::Error),

    #[error("导出内容编码错误: {0}")]
    Encoding(#[from] std::string::FromUtf8Error),
}

pub type ExportResult<T> = Result<T, ExportError>;

/// 文本加引号，内部引号双写
fn quote_text(text: &str) -> String {
    format!("\"{}\"", text.replace('"', "\"\""))
}

/// 表头仅在含分隔符、引号或换行时加引号
fn format_header(header: &str) -> String {
    if header.contains([',', '"', '\n', '\r']) {
        quote_text(header)
    } else {
        header.to_string()
    }
}

fn format_cell(value: Option<&CellValue>) -> String {
    match value {
        Some(CellValue::Int(v)) => format!("{:.2}", *v as f64),
        Some(CellValue::Float(v)) => format!("{:.2}", v),
        Some(CellValue::Text(s)) if !s.is_empty() => quote_text(s),
        _ => String::new(),
    }
}

/// 将记录按给定表头顺序导出为 CSV 文本
///
/// 字段在写入前已完成引号处理，写出器不再加引号
#[instrument(skip(records, headers), fields(count = records.len()))]
pub fn export_records_csv(records: &[WeldRecord], headers: &[String]) -> ExportResult<String> {
    let mut writer = WriterBuilder::new()
        .quote_style(QuoteStyle::Never)
        .from_writer(Vec::new());

    writer.write_record(headers.iter().map(|h| format_header(h)))?;
    for record in records {
        writer.write_record(headers.iter().map(|h| format_cell(record.cell(h))))?;
    }
    writer.flush()?;

    let body = writer
        .into_inner()
        .map_err(|e| ExportError::Io(e.into_error()))?;

    let mut out = String::with_capacity(UTF8_BOM.len() + body.len());
    out.push_str(UTF8_BOM);
    out.push_str(&String::from_utf8(body)?);
    Ok(out)
}

/// 导出到文件
pub fn export_records_to_path(
    records: &[WeldRecord],
    headers: &[String],
    path: &Path,
) -> ExportResult<()> {
    let content = export_records_csv(records, headers)?;
    let mut file = std::fs::File::create(path)?;
    file.write_all(content.as_bytes())?;

    info!(path = %path.display(), rows = records.len(), "导出完成");
    Ok(())
}

/// 默认文件名: weld_analytics_YYYY-MM-DD.csv
pub fn default_export_filename(date: NaiveDate) -> String {
    format!("weld_analytics_{}.csv", date.format("%Y-%m-%d"))
}
