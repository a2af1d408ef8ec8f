// ==========================================
// 智能配送路由系统 - Nominatim 地理编码
// ==========================================
// 降级服务: 开放数据,自由文本检索,返回多条排序候选
// 接口: GET {base_url}/search?q=&format=json&countrycodes=&limit=&viewbox=&bounded=
// ==========================================

use crate::config::NominatimConfig;
use crate::domain::stop::Coordinates;
use crate::geocoder::error::{GeocodeError, GeocodeResult};
use crate::geocoder::provider::{collect_valid_hits, GeocodeHit, GeocodeProvider, RegionFilter};
use crate::geocoder::rate_limiter::RateLimiter;
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

pub const PROVIDER_NAME: &str = "nominatim";

/// 检索结果(经纬度为字符串)
#[derive(Debug, Deserialize)]
struct Place {
    lat: String,
    lon: String,
    display_name: String,
}

// ==========================================
// NominatimProvider
// ==========================================
pub struct NominatimProvider {
    http_client: reqwest::Client,
    base_url: String,
    /// resolve 使用的默认过滤(suggest 由调用方传入)
    default_region: RegionFilter,
    rate_limiter: RateLimiter,
}

impl NominatimProvider {
    pub fn new(
        config: &NominatimConfig,
        default_region: RegionFilter,
        timeout: Duration,
    ) -> GeocodeResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| GeocodeError::ClientInit {
                provider: PROVIDER_NAME.to_string(),
                message: e.to_string(),
            })?;

        Ok(Self {
            http_client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            default_region,
            rate_limiter: RateLimiter::per_second(config.requests_per_second),
        })
    }

    async fn search(&self, query: &str, limit: usize, region: &RegionFilter) -> GeocodeResult<Vec<GeocodeHit>> {
        let mut params: Vec<(&str, String)> = vec![
            ("q", query.to_string()),
            ("format", "json".to_string()),
            ("limit", limit.max(1).to_string()),
        ];
        if let Some(codes) = &region.country_codes {
            params.push(("countrycodes", codes.clone()));
        }
        if let Some(viewbox) = &region.viewbox {
            params.push(("viewbox", viewbox.to_viewbox()));
            if region.bounded {
                params.push(("bounded", "1".to_string()));
            }
        }

        self.rate_limiter.acquire().await;
        debug!(provider = PROVIDER_NAME, query = %query, limit, "发送地理编码请求");

        let response = self
            .http_client
            .get(format!("{}/search", self.base_url))
            .query(&params)
            .send()
            .await
            .map_err(|e| GeocodeError::from_reqwest(PROVIDER_NAME, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(GeocodeError::from_status(PROVIDER_NAME, status.as_u16()));
        }

        let places: Vec<Place> = response
            .json()
            .await
            .map_err(|e| GeocodeError::from_reqwest(PROVIDER_NAME, e))?;

        collect_valid_hits(PROVIDER_NAME, places, place_to_hit)
    }
}

fn place_to_hit(place: Place) -> GeocodeResult<GeocodeHit> {
    let parse = |field: &str, value: &str| {
        value.trim().parse::<f64>().map_err(|_| GeocodeError::Decode {
            provider: PROVIDER_NAME.to_string(),
            message: format!("{} 无法解析为浮点数: {}", field, value),
        })
    };

    let coordinates = Coordinates::new(parse("lat", &place.lat)?, parse("lon", &place.lon)?);
    if !coordinates.is_valid() {
        return Err(GeocodeError::Decode {
            provider: PROVIDER_NAME.to_string(),
            message: "坐标超出范围".to_string(),
        });
    }

    Ok(GeocodeHit {
        coordinates,
        label: place.display_name,
        provider: PROVIDER_NAME.to_string(),
    })
}

#[async_trait]
impl GeocodeProvider for NominatimProvider {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    async fn resolve(&self, query: &str) -> GeocodeResult<GeocodeHit> {
        let region = RegionFilter {
            bounded: false,
            ..self.default_region.clone()
        };
        self.search(query, 1, &region)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| GeocodeError::not_found(PROVIDER_NAME, query))
    }

    async fn suggest(&self, query: &str, max_results: usize, region: &RegionFilter) -> Vec<String> {
        match self.search(query, max_results, region).await {
            Ok(hits) => {
                let mut labels: Vec<String> = Vec::with_capacity(hits.len());
                for hit in hits.into_iter().take(max_results) {
                    if !labels.contains(&hit.label) {
                        labels.push(hit.label);
                    }
                }
                labels
            }
            Err(e) => {
                warn!(provider = PROVIDER_NAME, error = %e, "候选地址生成失败");
                Vec::new()
            }
        }
    }
}
