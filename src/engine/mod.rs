// ==========================================
// 智能配送路由系统 - 引擎层
// ==========================================
// 职责: 地址解析策略 / 解析流程状态机 / 车辆聚类分配 / 调度起点
// 红线: 引擎不直接访问网络,经由 GeocodeProvider 抽象
// 红线: 聚类前置条件不满足时必须报错,不得静默调整车辆数
// ==========================================

pub mod address_resolver;
pub mod clustering;
pub mod dispatch_resolver;
pub mod error;
pub mod truck_assigner;
pub mod workflow;

// 重导出核心引擎
pub use address_resolver::{AddressResolver, QueryKind, StopResolution};
pub use clustering::{kmeans, KMeansParams, KMeansResult};
pub use dispatch_resolver::DispatchPointResolver;
pub use error::{ClusteringError, DispatchError, WorkflowError, WorkflowResult};
pub use truck_assigner::TruckAssigner;
pub use workflow::{
    FixOutcome, FixRequest, ResolutionWorkflow, ResolveSummary, StatusCounts, WorkflowContext,
    WorkflowPolicy,
};
