// ==========================================
// 智能配送路由系统 - 站点导入器
// ==========================================
// 职责: 整合导入流程,从文件到站点集合
// 流程: 解析 → 模板校验 → 字段映射 → 生成 Stop(稳定下标)
// ==========================================

use crate::domain::stop::{Stop, StopId};
use crate::domain::types::InputSchema;
use crate::importer::error::ImportResult;
use crate::importer::field_mapper::FieldMapper;
use crate::importer::file_parser::{FileParser, RawTable, UniversalFileParser};
use crate::importer::schema_validator::SchemaValidator;
use chrono::{DateTime, Utc};
use std::path::Path;
use tracing::{info, instrument};
use uuid::Uuid;

/// 导入结果
#[derive(Debug, Clone)]
pub struct ImportedStops {
    pub batch_id: String,
    pub imported_at: DateTime<Utc>,
    pub stops: Vec<Stop>,
}

// ==========================================
// StopImporter - 站点导入器
// ==========================================
pub struct StopImporter {
    file_parser: Box<dyn FileParser>,
    validator: SchemaValidator,
    field_mapper: FieldMapper,
}

impl StopImporter {
    /// 使用默认解析器(按扩展名选择 CSV / Excel)
    pub fn new(schema: InputSchema) -> Self {
        Self::with_parser(schema, Box::new(UniversalFileParser))
    }

    pub fn with_parser(schema: InputSchema, file_parser: Box<dyn FileParser>) -> Self {
        Self {
            file_parser,
            validator: SchemaValidator::new(schema),
            field_mapper: FieldMapper::new(),
        }
    }

    /// 从文件导入站点
    #[instrument(skip(self, file_path), fields(schema = %self.validator.schema()))]
    pub fn import_file<P: AsRef<Path>>(&self, file_path: P) -> ImportResult<ImportedStops> {
        let path = file_path.as_ref();
        info!(file_path = %path.display(), "开始导入配送站点");

        let table = self.file_parser.parse(path)?;
        self.import_table(table)
    }

    /// 从已解析的表格导入站点
    pub fn import_table(&self, table: RawTable) -> ImportResult<ImportedStops> {
        self.validator.validate(&table)?;

        let stops: Vec<Stop> = table
            .rows
            .iter()
            .enumerate()
            .map(|(idx, row)| Stop::new(StopId(idx), self.field_mapper.map_to_stop_record(row)))
            .collect();

        let batch_id = Uuid::new_v4().to_string();
        info!(
            batch_id = %batch_id,
            stops = stops.len(),
            total_weight_kg = stops.iter().map(|s| s.weight_kg).sum::<f64>(),
            "配送站点导入完成"
        );

        Ok(ImportedStops {
            batch_id,
            imported_at: Utc::now(),
            stops,
        })
    }
}
