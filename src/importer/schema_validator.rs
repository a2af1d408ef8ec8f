// ==========================================
// 智能配送路由系统 - 模板校验器
// ==========================================
// 职责: 列头与模板比对 / 必填字段非空校验
// 红线: 校验失败为致命错误,不进入地址解析
// ==========================================

use crate::domain::types::InputSchema;
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::file_parser::RawTable;

/// 每行必须非空的字段
pub const REQUIRED_NON_EMPTY: [&str; 2] = ["Client", "Address"];

pub struct SchemaValidator {
    schema: InputSchema,
}

impl SchemaValidator {
    pub fn new(schema: InputSchema) -> Self {
        Self { schema }
    }

    pub fn schema(&self) -> InputSchema {
        self.schema
    }

    /// 校验列头: 模板列必须全部出现(顺序不限,允许额外列)
    pub fn validate_headers(&self, headers: &[String]) -> ImportResult<()> {
        let missing: Vec<String> = self
            .schema
            .required_columns()
            .iter()
            .filter(|col| !headers.iter().any(|h| h == *col))
            .map(|col| col.to_string())
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(ImportError::MissingColumns {
                schema: self.schema.to_string(),
                missing,
            })
        }
    }

    /// 校验整张表: 列头 + 非空数据 + 每行必填字段
    pub fn validate(&self, table: &RawTable) -> ImportResult<()> {
        self.validate_headers(&table.headers)?;

        if table.rows.is_empty() {
            return Err(ImportError::NoDataRows);
        }

        for row in &table.rows {
            for field in REQUIRED_NON_EMPTY {
                let blank = row.get(field).map(|v| v.trim().is_empty()).unwrap_or(true);
                if blank {
                    return Err(ImportError::EmptyRequiredField {
                        row: row.row_number,
                        field: field.to_string(),
                    });
                }
            }
        }

        Ok(())
    }
}
