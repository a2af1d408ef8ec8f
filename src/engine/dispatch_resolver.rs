// ==========================================
// 智能配送路由系统 - 调度起点解析
// ==========================================
// 职责: 解析单个调度起点地址(地图锚点),与站点流程相互独立
// 复用 AddressResolver 的服务链与区域后缀
// ==========================================

use crate::domain::assignment::DispatchPoint;
use crate::engine::address_resolver::AddressResolver;
use crate::engine::error::DispatchError;
use std::sync::Arc;
use tracing::{info, warn};

pub struct DispatchPointResolver {
    resolver: Arc<AddressResolver>,
}

impl DispatchPointResolver {
    pub fn new(resolver: Arc<AddressResolver>) -> Self {
        Self { resolver }
    }

    /// 解析调度起点
    ///
    /// # 返回
    /// - Ok(DispatchPoint): 坐标 + 规范地址
    /// - Err(Unresolved): 服务链全部失败,调用方仍可继续分配
    pub async fn resolve(&self, address: &str) -> Result<DispatchPoint, DispatchError> {
        let query = address.trim();
        if query.is_empty() {
            return Err(DispatchError::EmptyAddress);
        }

        match self.resolver.resolve_qualified(query).await {
            Ok(hit) => {
                info!(address = %query, label = %hit.label, provider = %hit.provider, "调度起点已解析");
                Ok(DispatchPoint {
                    query: query.to_string(),
                    coordinates: hit.coordinates,
                    label: hit.label,
                })
            }
            Err(e) => {
                warn!(address = %query, error = %e, "调度起点无法解析");
                Err(DispatchError::Unresolved {
                    address: query.to_string(),
                    reason: e.to_string(),
                })
            }
        }
    }
}
