// ==========================================
// 智能配送路由系统 - 地理编码服务接口
// ==========================================
// 职责: 定义单个地理编码后端的能力(不包含实现)
// 实现者: OpenRouteServiceProvider, NominatimProvider
// ==========================================

use crate::config::{BoundingBox, RegionConfig};
use crate::domain::stop::{Coordinates, ResolvedLocation};
use crate::geocoder::error::{GeocodeError, GeocodeResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// 地理编码命中结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeocodeHit {
    pub coordinates: Coordinates,
    pub label: String,
    pub provider: String,
}

impl GeocodeHit {
    pub fn into_location(self) -> ResolvedLocation {
        ResolvedLocation {
            coordinates: self.coordinates,
            label: self.label,
            provider: self.provider,
        }
    }
}

/// 候选地址的地理范围过滤
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RegionFilter {
    /// ISO 国家代码(逗号分隔),如 "ph"
    pub country_codes: Option<String>,
    pub viewbox: Option<BoundingBox>,
    /// 是否严格限制在 viewbox 内
    pub bounded: bool,
}

impl From<&RegionConfig> for RegionFilter {
    fn from(region: &RegionConfig) -> Self {
        Self {
            country_codes: Some(region.country_codes.clone()).filter(|c| !c.trim().is_empty()),
            viewbox: region.viewbox,
            bounded: region.bounded,
        }
    }
}

/// 逐条转换响应中的候选,跳过无法解析的条目
///
/// 全部条目都无法解析时返回第一条错误(Decode),空响应返回空列表
pub(crate) fn collect_valid_hits<T, F>(provider: &str, entries: Vec<T>, convert: F) -> GeocodeResult<Vec<GeocodeHit>>
where
    F: Fn(T) -> GeocodeResult<GeocodeHit>,
{
    let mut hits = Vec::with_capacity(entries.len());
    let mut first_error: Option<GeocodeError> = None;

    for entry in entries {
        match convert(entry) {
            Ok(hit) => hits.push(hit),
            Err(e) => {
                warn!(provider = provider, error = %e, "跳过无法解析的候选");
                first_error.get_or_insert(e);
            }
        }
    }

    match first_error {
        Some(e) if hits.is_empty() => Err(e),
        _ => Ok(hits),
    }
}

// ==========================================
// GeocodeProvider Trait
// ==========================================
// 约束:
// - 必须有超时,网络故障不得 panic,全部折叠为 ProviderError
// - ProviderError 不携带坐标
#[async_trait]
pub trait GeocodeProvider: Send + Sync {
    /// 服务名称(日志/结果溯源)
    fn name(&self) -> &str;

    /// 解析地址
    ///
    /// # 返回
    /// - Ok(GeocodeHit): 坐标 + 规范地址
    /// - Err(NotFound): 无匹配
    /// - Err(其他): ProviderError
    async fn resolve(&self, query: &str) -> GeocodeResult<GeocodeHit>;

    /// 生成候选地址(按相关度排序),失败返回空列表
    async fn suggest(&self, query: &str, max_results: usize, region: &RegionFilter) -> Vec<String>;
}
