// ==========================================
// 智能配送路由系统 - 配置层
// ==========================================
// 职责: 系统配置定义与加载,支持文件 + 环境变量覆写
// 存储: JSON 配置文件(可选)
// ==========================================

pub mod config_manager;
pub mod dispatch_config;

// 重导出核心配置
pub use config_manager::{config_keys, validate, ConfigError, ConfigManager, ConfigResult};
pub use dispatch_config::{
    BoundingBox, ClusteringConfig, DispatchConfig, NominatimConfig, OpenRouteServiceConfig,
    ProvidersConfig, RegionConfig, WorkflowConfig,
};
