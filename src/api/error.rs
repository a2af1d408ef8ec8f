// ==========================================
// 智能配送路由系统 - API层错误类型
// ==========================================
// 职责: 汇总各层错误,转换为面向操作员的错误消息
// 说明: 地理编码失败不在此处出现(已转换为 NeedsFix 状态)
// ==========================================

use crate::config::ConfigError;
use crate::engine::error::{ClusteringError, DispatchError, WorkflowError};
use crate::export::ExportError;
use crate::geocoder::GeocodeError;
use crate::importer::ImportError;
use thiserror::Error;

/// API层错误类型
#[derive(Error, Debug)]
pub enum ApiError {
    // ==========================================
    // 致命错误: 需操作员处理后重试
    // ==========================================
    /// 模板/文件错误,阻断导入
    #[error("导入失败: {0}")]
    Schema(#[from] ImportError),

    /// 聚类前置条件不满足,阻断本次分配
    #[error("分配失败: {0}")]
    ClusteringPrecondition(ClusteringError),

    // ==========================================
    // 流程错误
    // ==========================================
    #[error("流程操作无效: {0}")]
    Workflow(WorkflowError),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    #[error("导出失败: {0}")]
    Export(#[from] ExportError),

    // ==========================================
    // 基础设施错误
    // ==========================================
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),

    #[error("地理编码服务初始化失败: {0}")]
    ProviderInit(#[from] GeocodeError),

    #[error("无效输入: {0}")]
    InvalidInput(String),
}

impl ApiError {
    /// 是否为阻断性错误(模板错误 / 聚类前置条件)
    pub fn is_fatal(&self) -> bool {
        matches!(self, ApiError::Schema(_) | ApiError::ClusteringPrecondition(_))
    }
}

// ==========================================
// 从 WorkflowError 转换
// 目的: 聚类前置条件单独归类,其余保持流程错误
// ==========================================
impl From<WorkflowError> for ApiError {
    fn from(err: WorkflowError) -> Self {
        match err {
            WorkflowError::ClusteringPrecondition(e) => ApiError::ClusteringPrecondition(e),
            other => ApiError::Workflow(other),
        }
    }
}

impl From<ClusteringError> for ApiError {
    fn from(err: ClusteringError) -> Self {
        ApiError::ClusteringPrecondition(err)
    }
}

/// Result 类型别名
pub type ApiResult<T> = Result<T, ApiError>;
