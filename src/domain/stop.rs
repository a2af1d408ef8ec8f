// ==========================================
// 智能配送路由系统 - 配送站点实体
// ==========================================
// 职责: 站点数据 + 原子坐标更新 + 状态转换
// 红线: 纬度/经度/规范地址 三者同时存在或同时缺失
// ==========================================

use crate::domain::types::StopStatus;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

// ==========================================
// StopId - 站点稳定标识(导入顺序下标)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StopId(pub usize);

impl StopId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for StopId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

// ==========================================
// Coordinates - 经纬度
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    /// 是否为合法经纬度
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }
}

// ==========================================
// ResolvedLocation - 解析结果(坐标 + 规范地址)
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedLocation {
    pub coordinates: Coordinates,
    pub label: String,
    /// 命中的地理编码服务名称
    pub provider: String,
}

// ==========================================
// RawStopRecord - 导入后的原始站点记录
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawStopRecord {
    pub row_number: usize,
    pub client: String,
    pub address: String,
    pub weight_kg: f64,
    /// 模板外的其余列,原样透传到导出
    pub extra_fields: BTreeMap<String, String>,
}

/// 非法状态转换
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("无效的状态转换: stop={stop} from={from} to={to}")]
pub struct InvalidStatusTransition {
    pub stop: StopId,
    pub from: StopStatus,
    pub to: StopStatus,
}

// ==========================================
// Stop - 配送站点
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stop {
    pub id: StopId,
    pub client: String,
    pub raw_address: String,
    pub weight_kg: f64,
    pub extra_fields: BTreeMap<String, String>,
    /// 候选地址(全部服务均失败时生成)
    pub suggestions: Vec<String>,
    /// 人工修正成功时使用的地址文本
    pub fixed_address: Option<String>,
    location: Option<ResolvedLocation>,
    status: StopStatus,
    fix_attempts: u32,
}

impl Stop {
    pub fn new(id: StopId, record: RawStopRecord) -> Self {
        Self {
            id,
            client: record.client,
            raw_address: record.address,
            weight_kg: record.weight_kg.max(0.0),
            extra_fields: record.extra_fields,
            suggestions: Vec::new(),
            fixed_address: None,
            location: None,
            status: StopStatus::Pending,
            fix_attempts: 0,
        }
    }

    pub fn status(&self) -> StopStatus {
        self.status
    }

    pub fn location(&self) -> Option<&ResolvedLocation> {
        self.location.as_ref()
    }

    pub fn coordinates(&self) -> Option<Coordinates> {
        self.location.as_ref().map(|l| l.coordinates)
    }

    pub fn latitude(&self) -> Option<f64> {
        self.coordinates().map(|c| c.latitude)
    }

    pub fn longitude(&self) -> Option<f64> {
        self.coordinates().map(|c| c.longitude)
    }

    pub fn resolved_address(&self) -> Option<&str> {
        self.location.as_ref().map(|l| l.label.as_str())
    }

    pub fn fix_attempts(&self) -> u32 {
        self.fix_attempts
    }

    fn transition(&mut self, next: StopStatus) -> Result<(), InvalidStatusTransition> {
        if !self.status.can_transition_to(next) {
            return Err(InvalidStatusTransition {
                stop: self.id,
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        Ok(())
    }

    /// 写入解析结果 → Resolved
    pub fn mark_resolved(&mut self, location: ResolvedLocation) -> Result<(), InvalidStatusTransition> {
        self.transition(StopStatus::Resolved)?;
        self.location = Some(location);
        self.suggestions.clear();
        Ok(())
    }

    /// 全部服务失败 → NeedsFix,附带候选地址
    pub fn mark_needs_fix(&mut self, suggestions: Vec<String>) -> Result<(), InvalidStatusTransition> {
        self.transition(StopStatus::NeedsFix)?;
        self.location = None;
        self.suggestions = suggestions;
        Ok(())
    }

    /// 人工修正成功
    pub fn apply_fix(
        &mut self,
        fix_text: &str,
        location: ResolvedLocation,
    ) -> Result<(), InvalidStatusTransition> {
        if self.status != StopStatus::NeedsFix {
            return Err(InvalidStatusTransition {
                stop: self.id,
                from: self.status,
                to: StopStatus::Resolved,
            });
        }
        self.fix_attempts += 1;
        self.fixed_address = Some(fix_text.to_string());
        self.mark_resolved(location)
    }

    /// 人工修正仍失败: 计数 +1,达到上限则 Failed
    pub fn record_failed_fix(&mut self, max_attempts: Option<u32>) -> Result<(), InvalidStatusTransition> {
        if self.status != StopStatus::NeedsFix {
            return Err(InvalidStatusTransition {
                stop: self.id,
                from: self.status,
                to: StopStatus::NeedsFix,
            });
        }
        self.fix_attempts += 1;
        match max_attempts {
            Some(cap) if self.fix_attempts >= cap => self.transition(StopStatus::Failed),
            _ => self.transition(StopStatus::NeedsFix),
        }
    }

    /// Resolved → Confirmed
    pub fn confirm(&mut self) -> Result<(), InvalidStatusTransition> {
        self.transition(StopStatus::Confirmed)
    }

    /// 人工重开: 清除坐标,回到 NeedsFix,修正计数清零
    pub fn reopen(&mut self) -> Result<(), InvalidStatusTransition> {
        if self.status == StopStatus::Pending || self.status == StopStatus::NeedsFix {
            return Err(InvalidStatusTransition {
                stop: self.id,
                from: self.status,
                to: StopStatus::NeedsFix,
            });
        }
        self.transition(StopStatus::NeedsFix)?;
        self.location = None;
        self.fixed_address = None;
        self.fix_attempts = 0;
        Ok(())
    }
}
