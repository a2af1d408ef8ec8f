// ==========================================
// 智能配送路由系统 - 站点解析流程
// ==========================================
// 职责: 批量解析 → 人工修正/确认 → 车辆分配 的状态机
// 红线: 站点状态与全局阶段只能经由本模块变更
// 红线: 任一站点未结清(Pending/NeedsFix/未确认)时不得进入分配
// 红线: 重开站点后旧分配结果失效
// ==========================================
// 并发: 批量解析按 max_concurrency 并发,结果按站点原子写回
// 中止: CancellationToken,已写回的结果保留,未开始的站点保持 Pending
// ==========================================

mod context;
mod core;
mod types;

#[cfg(test)]
mod tests;

pub use context::WorkflowContext;
pub use core::ResolutionWorkflow;
pub use types::{FixOutcome, FixRequest, ResolveSummary, StatusCounts, WorkflowPolicy};
