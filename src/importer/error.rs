// ==========================================
// 智能配送路由系统 - 导入模块错误类型
// ==========================================
// 工具: thiserror 派生宏
// 说明: 导入错误全部为致命错误,在解析开始前阻断流程
// ==========================================

use thiserror::Error;

/// 导入模块错误类型
#[derive(Error, Debug)]
pub enum ImportError {
    // ===== 文件相关错误 =====
    #[error("文件不存在: {0}")]
    FileNotFound(String),

    #[error("文件格式不支持: {0}（仅支持 .xlsx/.xls/.csv）")]
    UnsupportedFormat(String),

    #[error("文件读取失败: {0}")]
    FileReadError(String),

    #[error("Excel 解析失败: {0}")]
    ExcelParseError(String),

    #[error("CSV 解析失败: {0}")]
    CsvParseError(String),

    // ===== 模板校验错误 (SchemaError) =====
    #[error("列头不符合模板 ({schema}): 缺少 {missing:?}")]
    MissingColumns {
        schema: String,
        missing: Vec<String>,
    },

    #[error("必填字段为空 (行 {row}, 字段 {field})")]
    EmptyRequiredField { row: usize, field: String },

    #[error("文件无数据行")]
    NoDataRows,
}

impl ImportError {
    /// 是否为模板/列校验错误
    pub fn is_schema_error(&self) -> bool {
        matches!(
            self,
            ImportError::MissingColumns { .. }
                | ImportError::EmptyRequiredField { .. }
                | ImportError::NoDataRows
        )
    }
}

// 实现 From<std::io::Error>
impl From<std::io::Error> for ImportError {
    fn from(err: std::io::Error) -> Self {
        ImportError::FileReadError(err.to_string())
    }
}

// 实现 From<csv::Error>
impl From<csv::Error> for ImportError {
    fn from(err: csv::Error) -> Self {
        ImportError::CsvParseError(err.to_string())
    }
}

// 实现 From<calamine::Error>
impl From<calamine::Error> for ImportError {
    fn from(err: calamine::Error) -> Self {
        ImportError::ExcelParseError(err.to_string())
    }
}

/// Result 类型别名
pub type ImportResult<T> = Result<T, ImportError>;
