// ==========================================
// 智能配送路由系统 - API 层
// ==========================================
// 职责: 提供业务 API 接口,供 CLI 调用
// ==========================================

pub mod dispatch_api;
pub mod error;

// 重导出核心类型
pub use dispatch_api::DispatchApi;
pub use error::{ApiError, ApiResult};
