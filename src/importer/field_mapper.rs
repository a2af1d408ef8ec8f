// ==========================================
// 智能配送路由系统 - 字段映射器实现
// ==========================================
// 职责: 原始行 → RawStopRecord (客户/地址/重量/透传列)
// ==========================================

use crate::domain::stop::RawStopRecord;
use crate::importer::data_cleaner::DataCleaner;
use crate::importer::file_parser::RawRow;
use std::collections::BTreeMap;

pub const COL_CLIENT: &str = "Client";
pub const COL_ADDRESS: &str = "Address";
pub const COL_ORDER_AND_WEIGHT: &str = "Order and Weight";

pub struct FieldMapper {
    cleaner: DataCleaner,
}

impl Default for FieldMapper {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldMapper {
    pub fn new() -> Self {
        Self {
            cleaner: DataCleaner,
        }
    }

    /// 将原始行映射为 RawStopRecord
    ///
    /// 必填字段已由 SchemaValidator 保证非空,此处缺失时取空串
    pub fn map_to_stop_record(&self, row: &RawRow) -> RawStopRecord {
        let client = self.get_string(row, COL_CLIENT).unwrap_or_default();
        let address = self.get_string(row, COL_ADDRESS).unwrap_or_default();
        let weight_kg = self
            .get_string(row, COL_ORDER_AND_WEIGHT)
            .map(|text| self.cleaner.parse_weight_kg(&text))
            .unwrap_or(0.0);

        let extra_fields: BTreeMap<String, String> = row
            .values
            .iter()
            .filter(|(k, _)| k.as_str() != COL_CLIENT && k.as_str() != COL_ADDRESS)
            .filter(|(k, _)| !k.is_empty())
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        RawStopRecord {
            row_number: row.row_number,
            client,
            address,
            weight_kg,
            extra_fields,
        }
    }

    /// 提取字符串字段,重量列支持别名
    fn get_string(&self, row: &RawRow, key: &str) -> Option<String> {
        let aliases: &[&str] = match key {
            COL_ORDER_AND_WEIGHT => &["Order & Weight"],
            _ => &[],
        };

        std::iter::once(key)
            .chain(aliases.iter().copied())
            .find_map(|alias| self.cleaner.normalize_null(row.get(alias)))
    }
}
