// ==========================================
// 焊接生产分析看板 - 数据清洗器实现
// ==========================================
// 职责: TRIM / NULL 标准化 / 姓名归一化
// ==========================================

use crate::domain::types::{CellValue, NameCase};

#[derive(Debug, Clone, Copy, Default)]
pub struct DataCleaner {
    name_case: NameCase,
}

impl DataCleaner {
    pub fn new(name_case: NameCase) -> Self {
        Self { name_case }
    }

    /// 空白字符串 → None，否则去空白
    pub fn normalize_null(&self, value: Option<String>) -> Option<String> {
        value.and_then(|v| {
            let trimmed = v.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        })
    }

    /// 单元格转文本（数值按显示格式）
    pub fn cell_text(&self, cell: Option<&CellValue>) -> Option<String> {
        self.normalize_null(cell.map(|c| c.to_string()))
    }

    /// 归一化人员姓名
    ///
    /// 规则:
    /// 1) 取第一个以空白/逗号/句点分隔的词
    /// 2) 去除数字与标点（仅保留字母）
    /// 3) 大写（或首字母大写）
    /// 4) 结果为空 → None
    pub fn normalize_person_name(&self, raw: &str) -> Option<String> {
        let token = raw
            .split(|c: char| c.is_whitespace() || c == ',' || c == '.')
            .find(|t| !t.is_empty())?;

        let letters: String = token.chars().filter(|c| c.is_alphabetic()).collect();
        if letters.is_empty() {
            return None;
        }

        Some(match self.name_case {
            NameCase::Upper => letters.to_uppercase(),
            NameCase::Title => {
                let mut chars = letters.chars();
                match chars.next() {
                    Some(first) => first
                        .to_uppercase()
                        .chain(chars.flat_map(char::to_lowercase))
                        .collect(),
                    None => String::new(),
                }
            }
        })
    }
}
