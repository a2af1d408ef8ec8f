// ==========================================
// 智能配送路由系统 - 导出层
// ==========================================
// 职责: 已分配站点 → 表格行 → 文件
// 输入约定: 会话已完成分配,司机名单与车辆数一致
// ==========================================

pub mod csv_exporter;
pub mod error;
pub mod rows;

pub use csv_exporter::{write_csv, CsvExporter, ExportSink, FIXED_COLUMNS};
pub use error::{ExportError, ExportResult};
pub use rows::{build_rows, extra_columns, truck_summary, ExportRow};
