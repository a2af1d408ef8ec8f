// ==========================================
// 智能配送路由系统 - OpenRouteService 地理编码
// ==========================================
// 主服务: API Key 认证,结构化 GeoJSON 响应,仅取第一条结果
// 接口: GET {base_url}/geocode/search?api_key=&text=&boundary.country=&size=
// ==========================================

use crate::config::OpenRouteServiceConfig;
use crate::domain::stop::Coordinates;
use crate::geocoder::error::{GeocodeError, GeocodeResult};
use crate::geocoder::provider::{collect_valid_hits, GeocodeHit, GeocodeProvider, RegionFilter};
use crate::geocoder::rate_limiter::RateLimiter;
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

pub const PROVIDER_NAME: &str = "openrouteservice";

/// GeoJSON FeatureCollection(仅需要的字段)
#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    features: Vec<Feature>,
}

#[derive(Debug, Deserialize)]
struct Feature {
    geometry: Geometry,
    #[serde(default)]
    properties: Properties,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    /// [经度, 纬度]
    coordinates: Vec<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct Properties {
    label: Option<String>,
}

// ==========================================
// OpenRouteServiceProvider
// ==========================================
pub struct OpenRouteServiceProvider {
    http_client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    country: Option<String>,
    rate_limiter: RateLimiter,
}

impl OpenRouteServiceProvider {
    /// # 参数
    /// - config: 服务配置
    /// - region: 国家过滤(boundary.country)
    /// - timeout: 单次请求超时
    pub fn new(
        config: &OpenRouteServiceConfig,
        region: &RegionFilter,
        timeout: Duration,
    ) -> GeocodeResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GeocodeError::ClientInit {
                provider: PROVIDER_NAME.to_string(),
                message: e.to_string(),
            })?;

        Ok(Self {
            http_client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone().filter(|k| !k.trim().is_empty()),
            country: region
                .country_codes
                .as_ref()
                .and_then(|c| c.split(',').next())
                .map(|c| c.trim().to_uppercase())
                .filter(|c| !c.is_empty()),
            rate_limiter: RateLimiter::per_second(config.requests_per_second),
        })
    }

    async fn search(&self, query: &str, size: usize) -> GeocodeResult<Vec<GeocodeHit>> {
        let api_key = self.api_key.as_deref().ok_or_else(|| GeocodeError::MissingCredential {
            provider: PROVIDER_NAME.to_string(),
        })?;

        let mut params: Vec<(&str, String)> = vec![
            ("api_key", api_key.to_string()),
            ("text", query.to_string()),
            ("size", size.max(1).to_string()),
        ];
        if let Some(country) = &self.country {
            params.push(("boundary.country", country.clone()));
        }

        self.rate_limiter.acquire().await;
        debug!(provider = PROVIDER_NAME, query = %query, "发送地理编码请求");

        let response = self
            .http_client
            .get(format!("{}/geocode/search", self.base_url))
            .header("Accept", "application/json")
            .query(&params)
            .send()
            .await
            .map_err(|e| GeocodeError::from_reqwest(PROVIDER_NAME, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(GeocodeError::from_status(PROVIDER_NAME, status.as_u16()));
        }

        let body: SearchResponse = response
            .json()
            .await
            .map_err(|e| GeocodeError::from_reqwest(PROVIDER_NAME, e))?;

        collect_valid_hits(PROVIDER_NAME, body.features, feature_to_hit)
    }
}

fn feature_to_hit(feature: Feature) -> GeocodeResult<GeocodeHit> {
    let decode_err = |message: &str| GeocodeError::Decode {
        provider: PROVIDER_NAME.to_string(),
        message: message.to_string(),
    };

    let (lon, lat) = match feature.geometry.coordinates.as_slice() {
        [lon, lat, ..] => (*lon, *lat),
        _ => return Err(decode_err("coordinates 少于两个分量")),
    };
    let coordinates = Coordinates::new(lat, lon);
    if !coordinates.is_valid() {
        return Err(decode_err("坐标超出范围"));
    }

    let label = feature
        .properties
        .label
        .filter(|l| !l.trim().is_empty())
        .ok_or_else(|| decode_err("缺少 label"))?;

    Ok(GeocodeHit {
        coordinates,
        label,
        provider: PROVIDER_NAME.to_string(),
    })
}

#[async_trait]
impl GeocodeProvider for OpenRouteServiceProvider {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    async fn resolve(&self, query: &str) -> GeocodeResult<GeocodeHit> {
        self.search(query, 1)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| GeocodeError::not_found(PROVIDER_NAME, query))
    }

    async fn suggest(&self, query: &str, max_results: usize, _region: &RegionFilter) -> Vec<String> {
        match self.search(query, max_results).await {
            Ok(hits) => hits.into_iter().take(max_results).map(|h| h.label).collect(),
            Err(e) => {
                warn!(provider = PROVIDER_NAME, error = %e, "候选地址生成失败");
                Vec::new()
            }
        }
    }
}
