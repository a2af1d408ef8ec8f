// ==========================================
// 智能配送路由系统 - 导出错误类型
// ==========================================

use crate::domain::stop::StopId;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("尚未完成车辆分配")]
    MissingAssignment,

    #[error("司机名单数量 {roster} 与车辆数 {num_trucks} 不一致")]
    RosterMismatch { roster: usize, num_trucks: usize },

    #[error("已分配站点缺少坐标: {0}")]
    MissingCoordinates(StopId),

    #[error("站点不存在: {0}")]
    StopNotFound(StopId),

    #[error("CSV 写入失败: {0}")]
    CsvWriteError(#[from] csv::Error),

    #[error("文件写入失败: {0}")]
    IoError(#[from] std::io::Error),
}

pub type ExportResult<T> = Result<T, ExportError>;
