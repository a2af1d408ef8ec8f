// ==========================================
// 智能配送路由系统 - 配置项定义
// ==========================================
// 职责: 全部可配置项及其默认值(serde 反序列化,缺省字段取默认)
// ==========================================

use crate::domain::types::InputSchema;
use serde::{Deserialize, Serialize};

// ==========================================
// 地理范围过滤
// ==========================================

/// 经纬度矩形(Nominatim viewbox: 左,上,右,下)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_lon: f64,
    pub max_lat: f64,
    pub max_lon: f64,
    pub min_lat: f64,
}

impl BoundingBox {
    /// 宿务省粗略范围
    pub fn cebu() -> Self {
        Self {
            min_lon: 123.5,
            max_lat: 11.6,
            max_lon: 124.2,
            min_lat: 10.1,
        }
    }

    /// viewbox 参数格式 "x1,y1,x2,y2"
    pub fn to_viewbox(&self) -> String {
        format!("{},{},{},{}", self.min_lon, self.max_lat, self.max_lon, self.min_lat)
    }

    pub fn contains(&self, latitude: f64, longitude: f64) -> bool {
        (self.min_lat..=self.max_lat).contains(&latitude)
            && (self.min_lon..=self.max_lon).contains(&longitude)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegionConfig {
    /// 追加到原始地址后的区域后缀
    pub suffix: String,
    /// ISO 国家代码(逗号分隔)
    pub country_codes: String,
    pub viewbox: Option<BoundingBox>,
    /// 是否只返回 viewbox 内结果
    pub bounded: bool,
    pub max_suggestions: usize,
}

impl Default for RegionConfig {
    fn default() -> Self {
        Self {
            suffix: ", Cebu, Philippines".to_string(),
            country_codes: "ph".to_string(),
            viewbox: Some(BoundingBox::cebu()),
            bounded: true,
            max_suggestions: 5,
        }
    }
}

// ==========================================
// 地理编码服务
// ==========================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenRouteServiceConfig {
    pub enabled: bool,
    pub base_url: String,
    /// API Key,缺失时该服务每次返回 ProviderError
    pub api_key: Option<String>,
    pub requests_per_second: f64,
}

impl Default for OpenRouteServiceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: "https://api.openrouteservice.org".to_string(),
            api_key: None,
            requests_per_second: 5.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NominatimConfig {
    pub base_url: String,
    pub user_agent: String,
    /// 公共实例使用策略: 不超过 1 次/秒
    pub requests_per_second: f64,
}

impl Default for NominatimConfig {
    fn default() -> Self {
        Self {
            base_url: "https://nominatim.openstreetmap.org".to_string(),
            user_agent: "smart-routing".to_string(),
            requests_per_second: 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvidersConfig {
    pub openrouteservice: OpenRouteServiceConfig,
    pub nominatim: NominatimConfig,
}

// ==========================================
// 解析流程策略
// ==========================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowConfig {
    /// true: 已解析站点需逐个人工确认; false: 解析即确认
    pub require_explicit_confirmation: bool,
    /// 人工修正次数上限,None 表示不设上限
    pub max_fix_attempts: Option<u32>,
    /// 去掉区域后缀的二次查询命中时是否直接采用
    /// (false: 仅作为第一条候选地址)
    pub accept_secondary_hits: bool,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            require_explicit_confirmation: false,
            max_fix_attempts: Some(5),
            accept_secondary_hits: true,
        }
    }
}

// ==========================================
// 聚类参数
// ==========================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusteringConfig {
    /// 固定随机种子,保证分配可复现
    pub seed: u64,
    /// 不同初始中心的重复次数,取簇内平方和最小者
    pub n_init: usize,
    pub max_iterations: usize,
    /// 收敛阈值(相对于特征方差)
    pub tolerance: f64,
}

impl Default for ClusteringConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            n_init: 10,
            max_iterations: 300,
            tolerance: 1e-4,
        }
    }
}

// ==========================================
// DispatchConfig - 系统配置根
// ==========================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    pub schema: InputSchema,
    pub region: RegionConfig,
    pub providers: ProvidersConfig,
    pub request_timeout_secs: u64,
    /// 并发解析的站点数上限
    pub max_concurrency: usize,
    pub workflow: WorkflowConfig,
    pub clustering: ClusteringConfig,
    pub dispatch_address: String,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            schema: InputSchema::Minimal,
            region: RegionConfig::default(),
            providers: ProvidersConfig::default(),
            request_timeout_secs: 10,
            max_concurrency: 4,
            workflow: WorkflowConfig::default(),
            clustering: ClusteringConfig::default(),
            dispatch_address: "S Jayme St, Mandaue, Cebu".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_viewbox_format() {
        assert_eq!(BoundingBox::cebu().to_viewbox(), "123.5,11.6,124.2,10.1");
    }

    #[test]
    fn test_bounding_box_contains() {
        let bbox = BoundingBox::cebu();
        assert!(bbox.contains(10.3157, 123.8854)); // Cebu City
        assert!(!bbox.contains(14.5995, 120.9842)); // Manila
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: DispatchConfig =
            serde_json::from_str(r#"{"max_concurrency": 8, "clustering": {"seed": 1}}"#).unwrap();

        assert_eq!(config.max_concurrency, 8);
        assert_eq!(config.clustering.seed, 1);
        assert_eq!(config.clustering.n_init, 10);
        assert_eq!(config.region.suffix, ", Cebu, Philippines");
        assert_eq!(config.workflow.max_fix_attempts, Some(5));
    }
}
