// ==========================================
// 智能配送路由系统 - 引擎层错误类型
// ==========================================
// 说明:
// - 地理编码失败不在此处出现,已在 AddressResolver 内转换为 NeedsFix
// - ClusteringPrecondition 对本次分配致命,必须上报,不得静默截断
// ==========================================

use crate::domain::stop::{InvalidStatusTransition, StopId};
use crate::domain::types::WorkflowPhase;
use thiserror::Error;

/// 聚类前置条件错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClusteringError {
    #[error("没有可分配的站点")]
    EmptyValidSet,

    #[error("车辆数必须 >= 1")]
    ZeroTrucks,

    #[error("车辆数 {num_trucks} 超过可分配站点数 {stops}")]
    TooManyTrucks { num_trucks: usize, stops: usize },

    #[error("站点缺少坐标: {0}")]
    MissingCoordinates(StopId),

    #[error("司机名单数量 {roster} 与车辆数 {num_trucks} 不一致")]
    RosterMismatch { roster: usize, num_trucks: usize },
}

/// 解析流程错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum WorkflowError {
    #[error(transparent)]
    InvalidTransition(#[from] InvalidStatusTransition),

    #[error("当前阶段 {actual} 不允许该操作 (需要 {expected})")]
    InvalidPhase {
        expected: String,
        actual: WorkflowPhase,
    },

    #[error("无效的阶段转换: from={from} to={to}")]
    InvalidPhaseTransition {
        from: WorkflowPhase,
        to: WorkflowPhase,
    },

    #[error("站点不存在: {0}")]
    StopNotFound(StopId),

    #[error("候选地址下标越界: stop={stop}, index={index}, available={available}")]
    SuggestionOutOfRange {
        stop: StopId,
        index: usize,
        available: usize,
    },

    #[error("修正地址为空: stop={0}")]
    EmptyFix(StopId),

    #[error("导入数据为空")]
    NoStops,

    #[error("聚类前置条件不满足: {0}")]
    ClusteringPrecondition(#[from] ClusteringError),
}

/// 调度起点解析错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    #[error("调度起点无法解析: {address} ({reason})")]
    Unresolved { address: String, reason: String },

    #[error("调度起点地址为空")]
    EmptyAddress,
}

pub type WorkflowResult<T> = Result<T, WorkflowError>;
