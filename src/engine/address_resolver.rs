// ==========================================
// 智能配送路由系统 - 地址解析器
// ==========================================
// 职责: 单个站点的地址解析策略
// 流程:
//   1. 完整查询(原始地址 + 区域后缀) 依次尝试服务链
//   2. 次级查询(去掉区域后缀) 依次尝试服务链
//   3. 全部失败 → 降级服务生成候选地址 → NeedsFix
// 约束: 单个服务失败不会中止站点解析,只会进入下一级
// ==========================================

use crate::config::RegionConfig;
use crate::domain::stop::{InvalidStatusTransition, Stop};
use crate::geocoder::{GeocodeError, GeocodeHit, GeocodeProvider, GeocodeResult, RegionFilter};
use std::sync::Arc;
use tracing::{debug, warn};

/// 命中来自哪一级查询
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryKind {
    Qualified,
    Secondary,
}

/// 单个地址的解析结果
#[derive(Debug, Clone, PartialEq)]
pub enum StopResolution {
    Resolved { hit: GeocodeHit, via: QueryKind },
    Unresolved { suggestions: Vec<String> },
}

// ==========================================
// AddressResolver
// ==========================================
pub struct AddressResolver {
    /// 按优先级排序,最后一个同时负责候选地址
    providers: Vec<Arc<dyn GeocodeProvider>>,
    region_suffix: String,
    region_filter: RegionFilter,
    max_suggestions: usize,
    /// 次级查询命中是否直接采用(否则作为首个候选)
    accept_secondary_hits: bool,
}

impl AddressResolver {
    pub fn new(
        providers: Vec<Arc<dyn GeocodeProvider>>,
        region: &RegionConfig,
        accept_secondary_hits: bool,
    ) -> Self {
        Self {
            providers,
            region_suffix: region.suffix.clone(),
            region_filter: RegionFilter::from(region),
            max_suggestions: region.max_suggestions,
            accept_secondary_hits,
        }
    }

    pub fn providers(&self) -> &[Arc<dyn GeocodeProvider>] {
        &self.providers
    }

    /// 追加区域后缀
    ///
    /// 地址最后一段(逗号分隔)与后缀最后一段相同(如 "..., Philippines")时不重复追加
    pub fn qualify(&self, address: &str) -> String {
        let address = address.trim();
        let tail = self
            .region_suffix
            .rsplit(',')
            .map(str::trim)
            .find(|s| !s.is_empty());
        let last_component = address.rsplit(',').next().map(str::trim).unwrap_or("");

        match tail {
            None => address.to_string(),
            Some(tail) if last_component.eq_ignore_ascii_case(tail) => address.to_string(),
            Some(_) => format!("{}{}", address, self.region_suffix),
        }
    }

    /// 依次尝试服务链,返回第一个命中
    async fn resolve_query(&self, query: &str) -> GeocodeResult<GeocodeHit> {
        let mut last_error: Option<GeocodeError> = None;

        for provider in &self.providers {
            match provider.resolve(query).await {
                Ok(hit) => {
                    debug!(provider = provider.name(), query = %query, label = %hit.label, "地址命中");
                    return Ok(hit);
                }
                Err(e) if e.is_not_found() => {
                    debug!(provider = provider.name(), query = %query, "无匹配结果");
                    last_error = Some(e);
                }
                Err(e) => {
                    warn!(provider = provider.name(), query = %query, error = %e, "地理编码服务失败,尝试下一个");
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| GeocodeError::not_found("none", query)))
    }

    /// 以完整查询解析任意地址文本(人工修正 / 调度起点使用)
    pub async fn resolve_qualified(&self, address: &str) -> GeocodeResult<GeocodeHit> {
        self.resolve_query(&self.qualify(address)).await
    }

    /// 候选地址(降级服务,区域过滤)
    pub async fn suggest(&self, address: &str) -> Vec<String> {
        match self.providers.last() {
            Some(provider) => {
                provider
                    .suggest(address.trim(), self.max_suggestions, &self.region_filter)
                    .await
            }
            None => Vec::new(),
        }
    }

    /// 对原始地址执行完整解析策略
    pub async fn lookup(&self, raw_address: &str) -> StopResolution {
        let qualified = self.qualify(raw_address);
        if let Ok(hit) = self.resolve_query(&qualified).await {
            return StopResolution::Resolved {
                hit,
                via: QueryKind::Qualified,
            };
        }

        let secondary = raw_address.trim();
        let mut secondary_label: Option<String> = None;
        if !secondary.is_empty() && secondary != qualified {
            if let Ok(hit) = self.resolve_query(secondary).await {
                if self.accept_secondary_hits {
                    return StopResolution::Resolved {
                        hit,
                        via: QueryKind::Secondary,
                    };
                }
                secondary_label = Some(hit.label);
            }
        }

        let mut suggestions = Vec::with_capacity(self.max_suggestions);
        if let Some(label) = secondary_label {
            suggestions.push(label);
        }
        for candidate in self.suggest(raw_address).await {
            if !suggestions.contains(&candidate) {
                suggestions.push(candidate);
            }
        }
        suggestions.truncate(self.max_suggestions);

        StopResolution::Unresolved { suggestions }
    }

    /// 解析单个站点,返回更新后的副本
    ///
    /// # 返回
    /// - Resolved: 坐标 + 规范地址同时写入
    /// - NeedsFix: 坐标为空,附候选地址
    pub async fn resolve_stop(&self, stop: &Stop) -> Result<Stop, InvalidStatusTransition> {
        let mut next = stop.clone();
        match self.lookup(&stop.raw_address).await {
            StopResolution::Resolved { hit, via } => {
                debug!(stop = %stop.id, via = ?via, "站点已解析");
                next.mark_resolved(hit.into_location())?;
            }
            StopResolution::Unresolved { suggestions } => {
                debug!(stop = %stop.id, suggestions = suggestions.len(), "站点需人工修正");
                next.mark_needs_fix(suggestions)?;
            }
        }
        Ok(next)
    }
}
