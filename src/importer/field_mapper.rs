// ==========================================
// 焊接生产分析看板 - 字段映射器实现
// ==========================================
// 职责: 列分类（文本/整数/默认数值）+ 类型转换 + 列别名解析
// 别名解析在归一化时一次完成：每个逻辑字段 → 按优先级排列的列下标
// ==========================================

use crate::domain::types::{lenient_parse_f64, CellValue};
use std::collections::HashMap;

// ==========================================
// ColumnKind - 列分类
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Text,
    Integer,
    /// 默认数值列；`millimeters` 为 true 时数值 / 1000 转为米
    Numeric { millimeters: bool },
}

// ==========================================
// LogicalField - 逻辑字段
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogicalField {
    Date,
    Order,
    Component,
    Welder,
    WeldLength,
    WireTotal,
    Diameter,
    Thickness,
    CuttingType,
    WireMaterial,
    Stage,
    DetectionDate,
    Executor,
}

impl LogicalField {
    pub const ALL: [LogicalField; 13] = [
        LogicalField::Date,
        LogicalField::Order,
        LogicalField::Component,
        LogicalField::Welder,
        LogicalField::WeldLength,
        LogicalField::WireTotal,
        LogicalField::Diameter,
        LogicalField::Thickness,
        LogicalField::CuttingType,
        LogicalField::WireMaterial,
        LogicalField::Stage,
        LogicalField::DetectionDate,
        LogicalField::Executor,
    ];
}

fn owned(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

// ==========================================
// ColumnSchema - 列名配置
// ==========================================
// 分类按列名子串匹配（忽略大小写），文本优先于整数
// 别名按列名完全匹配（忽略大小写），靠前者优先
#[derive(Debug, Clone)]
pub struct ColumnSchema {
    pub string_fields: Vec<String>,
    pub integer_fields: Vec<String>,
    pub millimeter_markers: Vec<String>,
    pub aliases: HashMap<LogicalField, Vec<String>>,
    pub primary_rejection_labels: Vec<String>,
    pub rework_labels: Vec<String>,
}

impl Default for ColumnSchema {
    fn default() -> Self {
        let mut aliases = HashMap::new();
        aliases.insert(LogicalField::Date, owned(&["Дата", "Date"]));
        aliases.insert(
            LogicalField::Order,
            owned(&["Номер заказа", "№Заказа", "Заказ", "Order Number", "OrderNo", "Order"]),
        );
        aliases.insert(
            LogicalField::Component,
            owned(&[
                "№ Днища, № чертежа, артикул",
                "№Днища",
                "№ Днища",
                "Номер днища",
                "Номер Днища",
                "Component Number",
                "ComponentId",
                "Component",
            ]),
        );
        aliases.insert(
            LogicalField::Welder,
            owned(&["Сварщик", "ФИО", "ФИО сварщика", "Welder", "Welder Name"]),
        );
        aliases.insert(
            LogicalField::WeldLength,
            owned(&["Длина сварных швов", "Weld Length", "WeldLength"]),
        );
        aliases.insert(
            LogicalField::WireTotal,
            owned(&["ИТОГО проволока", "Wire Total", "WireTotal"]),
        );
        aliases.insert(LogicalField::Diameter, owned(&["Диаметр", "Diameter"]));
        aliases.insert(LogicalField::Thickness, owned(&["Толщина", "Thickness"]));
        aliases.insert(
            LogicalField::CuttingType,
            owned(&["Раскрой", "Cutting", "Cutting Type", "CuttingType"]),
        );
        aliases.insert(
            LogicalField::WireMaterial,
            owned(&["Проволока", "Wire", "Wire Material", "WireMaterial"]),
        );
        aliases.insert(
            LogicalField::Stage,
            owned(&["Технологическая операция", "Stage", "Operation"]),
        );
        aliases.insert(
            LogicalField::DetectionDate,
            owned(&["Дата выяв-ния несоответствия", "Detection Date", "DetectionDate", "Дата", "Date"]),
        );
        aliases.insert(
            LogicalField::Executor,
            owned(&["Исполнитель, допустивший несоответствие", "Executor"]),
        );

        Self {
            string_fields: owned(&[
                "Заказ",
                "№Заказа",
                "Номер заказа",
                "Заказчик",
                "Сварщик",
                "ФИО",
                "ФИО сварщика",
                "Тип днища",
                "Дата",
                "№Днища",
                "№ Днища",
                "№ Днища, № чертежа, артикул",
                "Номер днища",
                "Номер Днища",
                "Материал",
                "Вид контроля",
                "Вид дефекта",
                "Описание несоответствия",
                "№ акта о несоответствии",
                "Исполнитель",
                "Причина несоответствия",
                "Способ устранения",
                "Контроль выполнил",
                "Раскрой",
                "Технологическая операция",
                "Order",
                "Component",
                "Welder",
                "Date",
                "Cutting",
                "Wire Material",
                "WireMaterial",
                "Stage",
                "Operation",
                "Executor",
            ]),
            integer_fields: owned(&[
                "Месяц",
                "Днище",
                "Толщина",
                "Диаметр",
                "Количество выявленных дефектов",
                "Номер днища",
                "Номер Днища",
                "Month",
                "Diameter",
                "Thickness",
            ]),
            millimeter_markers: owned(&["длина сварных швов", "weld length", "weldlength"]),
            aliases,
            primary_rejection_labels: owned(&["Предъявление продукции", "primary-rejection"]),
            rework_labels: owned(&["Исправление повторное", "rework"]),
        }
    }
}

impl ColumnSchema {
    pub fn aliases(&self, field: LogicalField) -> &[String] {
        self.aliases.get(&field).map(Vec::as_slice).unwrap_or(&[])
    }
}

// ==========================================
// ResolvedColumns - 一次解析的列布局
// ==========================================
#[derive(Debug, Clone)]
pub struct ResolvedColumns {
    pub kinds: Vec<ColumnKind>,
    fields: HashMap<LogicalField, Vec<usize>>,
}

impl ResolvedColumns {
    /// 按优先级取第一个非空的别名列
    pub fn first_populated<'a>(
        &self,
        field: LogicalField,
        values: &'a [CellValue],
    ) -> Option<&'a CellValue> {
        self.fields
            .get(&field)?
            .iter()
            .filter_map(|&idx| values.get(idx))
            .find(|v| !v.is_empty())
    }

    /// 逻辑字段是否存在任一别名列
    pub fn has_field(&self, field: LogicalField) -> bool {
        self.fields.get(&field).is_some_and(|cols| !cols.is_empty())
    }
}

// ==========================================
// FieldMapper
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct FieldMapper {
    schema: ColumnSchema,
}

impl FieldMapper {
    pub fn new(schema: ColumnSchema) -> Self {
        Self { schema }
    }

    pub fn schema(&self) -> &ColumnSchema {
        &self.schema
    }

    /// 列分类（子串匹配，文本优先）
    pub fn classify(&self, column: &str) -> ColumnKind {
        let key = column.to_lowercase();
        let matches = |set: &[String]| set.iter().any(|f| key.contains(&f.to_lowercase()));

        if matches(&self.schema.string_fields) {
            ColumnKind::Text
        } else if matches(&self.schema.integer_fields) {
            ColumnKind::Integer
        } else {
            ColumnKind::Numeric {
                millimeters: matches(&self.schema.millimeter_markers),
            }
        }
    }

    /// 按列分类转换单元格
    ///
    /// - 文本: 去空白原样保留
    /// - 整数: 宽松解析后取整，失败为 0
    /// - 默认数值: 可解析（含逗号小数）→ 浮点，毫米列 / 1000；否则保留文本
    pub fn coerce(&self, kind: ColumnKind, raw: &str) -> CellValue {
        let value = raw.trim();
        if value.is_empty() {
            return CellValue::Empty;
        }

        match kind {
            ColumnKind::Text => CellValue::Text(value.to_string()),
            ColumnKind::Integer => {
                CellValue::Int(lenient_parse_f64(value).map(|v| v.trunc() as i64).unwrap_or(0))
            }
            ColumnKind::Numeric { millimeters } => match lenient_parse_f64(value) {
                Some(v) if millimeters => CellValue::Float(v / 1000.0),
                Some(v) => CellValue::Float(v),
                None => CellValue::Text(value.to_string()),
            },
        }
    }

    /// 解析表头：列分类 + 逻辑字段别名下标
    pub fn resolve(&self, headers: &[String]) -> ResolvedColumns {
        let kinds = headers.iter().map(|h| self.classify(h)).collect();

        let mut fields = HashMap::new();
        for field in LogicalField::ALL {
            let columns: Vec<usize> = self
                .schema
                .aliases(field)
                .iter()
                .flat_map(|alias| {
                    headers
                        .iter()
                        .enumerate()
                        .filter(move |(_, h)| h.trim().to_lowercase() == alias.to_lowercase())
                        .map(|(idx, _)| idx)
                })
                .collect();
            fields.insert(field, columns);
        }

        ResolvedColumns { kinds, fields }
    }
}
