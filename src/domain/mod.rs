// ==========================================
// 智能配送路由系统 - 领域模型层
// ==========================================
// 职责: 定义领域实体、类型、状态转换表
// 红线: 不含网络访问,不含引擎逻辑
// ==========================================

pub mod assignment;
pub mod stop;
pub mod types;

// 重导出核心类型
pub use assignment::{Assignment, DispatchPoint, DriverRoster, TruckSlot};
pub use stop::{
    Coordinates, InvalidStatusTransition, RawStopRecord, ResolvedLocation, Stop, StopId,
};
pub use types::{InputSchema, StopStatus, WorkflowPhase};
