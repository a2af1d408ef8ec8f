// ==========================================
// 智能配送路由系统 - 核心库
// ==========================================
// 职责: 配送站点地址解析 → 人工修正确认 → 车辆聚类分配
// 技术栈: Rust + Tokio + reqwest
// 系统定位: 调度辅助工具 (人工最终确认)
// 非目标: 不做路线排序/时间窗/载重优化
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 配置层 - 系统配置
pub mod config;

// 导入层 - 外部数据
pub mod importer;

// 地理编码层 - 外部服务
pub mod geocoder;

// 引擎层 - 解析流程与分配
pub mod engine;

// 导出层
pub mod export;

// 日志系统
pub mod logging;

// API 层 - 业务接口
pub mod api;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{InputSchema, StopStatus, WorkflowPhase};

// 领域实体
pub use domain::{Assignment, Coordinates, DispatchPoint, DriverRoster, RawStopRecord, Stop, StopId};

// 引擎
pub use engine::{
    AddressResolver, DispatchPointResolver, FixOutcome, FixRequest, ResolutionWorkflow,
    TruckAssigner, WorkflowContext,
};

// 地理编码
pub use geocoder::{GeocodeError, GeocodeProvider, NominatimProvider, OpenRouteServiceProvider};

// API
pub use api::{ApiError, ApiResult, DispatchApi};

// 配置
pub use config::{ConfigManager, DispatchConfig};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "智能配送路由系统";
