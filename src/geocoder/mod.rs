// ==========================================
// 智能配送路由系统 - 地理编码层
// ==========================================
// 职责: 外部地理编码服务接入(超时/限流/错误归类)
// 优先级: OpenRouteService(主) → Nominatim(降级 + 候选地址)
// ==========================================

pub mod error;
pub mod nominatim;
pub mod openrouteservice;
pub mod provider;
pub mod rate_limiter;

pub use error::{GeocodeError, GeocodeResult};
pub use nominatim::NominatimProvider;
pub use openrouteservice::OpenRouteServiceProvider;
pub use provider::{GeocodeHit, GeocodeProvider, RegionFilter};
pub use rate_limiter::RateLimiter;

use crate::config::DispatchConfig;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// 按配置构建服务链(按优先级排序,最后一个为降级服务)
pub fn build_provider_chain(config: &DispatchConfig) -> GeocodeResult<Vec<Arc<dyn GeocodeProvider>>> {
    let timeout = Duration::from_secs(config.request_timeout_secs);
    let region = RegionFilter::from(&config.region);

    let mut chain: Vec<Arc<dyn GeocodeProvider>> = Vec::new();

    let ors = &config.providers.openrouteservice;
    if ors.enabled {
        chain.push(Arc::new(OpenRouteServiceProvider::new(ors, &region, timeout)?));
    }

    chain.push(Arc::new(NominatimProvider::new(
        &config.providers.nominatim,
        region,
        timeout,
    )?));

    info!(
        providers = ?chain.iter().map(|p| p.name().to_string()).collect::<Vec<_>>(),
        timeout_secs = config.request_timeout_secs,
        "地理编码服务链已构建"
    );

    Ok(chain)
}
