// ==========================================
// 智能配送路由系统 - 导入层
// ==========================================
// 职责: 外部文件导入,生成配送站点集合
// 支持: Excel, CSV
// ==========================================

// 模块声明
pub mod data_cleaner;
pub mod error;
pub mod field_mapper;
pub mod file_parser;
pub mod schema_validator;
pub mod stop_importer;

// 重导出核心类型
pub use data_cleaner::DataCleaner;
pub use error::{ImportError, ImportResult};
pub use field_mapper::FieldMapper;
pub use file_parser::{CsvParser, ExcelParser, FileParser, RawRow, RawTable, UniversalFileParser};
pub use schema_validator::SchemaValidator;
pub use stop_importer::{ImportedStops, StopImporter};
