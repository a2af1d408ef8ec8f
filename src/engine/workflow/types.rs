// ==========================================
// 智能配送路由系统 - 解析流程类型
// ==========================================

use crate::config::WorkflowConfig;
use crate::domain::stop::{ResolvedLocation, StopId};
use serde::{Deserialize, Serialize};

// ==========================================
// WorkflowPolicy - 流程策略
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowPolicy {
    /// true: Resolved 需操作员显式确认;false: 解析成功即确认
    pub require_explicit_confirmation: bool,
    /// 人工修正次数上限,None 表示不限
    pub max_fix_attempts: Option<u32>,
}

impl Default for WorkflowPolicy {
    fn default() -> Self {
        WorkflowPolicy::from(&WorkflowConfig::default())
    }
}

impl From<&WorkflowConfig> for WorkflowPolicy {
    fn from(config: &WorkflowConfig) -> Self {
        Self {
            require_explicit_confirmation: config.require_explicit_confirmation,
            max_fix_attempts: config.max_fix_attempts,
        }
    }
}

/// 人工修正输入: 选择候选地址,或手工输入
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FixRequest {
    Suggestion(usize),
    Manual(String),
}

/// 单次修正结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FixOutcome {
    Resolved { stop: StopId, location: ResolvedLocation },
    StillUnresolved { stop: StopId, attempts: u32 },
    Failed { stop: StopId, attempts: u32 },
}

impl FixOutcome {
    pub fn stop(&self) -> StopId {
        match self {
            FixOutcome::Resolved { stop, .. }
            | FixOutcome::StillUnresolved { stop, .. }
            | FixOutcome::Failed { stop, .. } => *stop,
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, FixOutcome::Resolved { .. })
    }
}

/// 批量解析汇总
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolveSummary {
    pub attempted: usize,
    pub resolved: usize,
    pub needs_fix: usize,
    /// 因中止未处理的站点数
    pub skipped: usize,
    pub cancelled: bool,
}

/// 各状态站点计数
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
    pub pending: usize,
    pub resolved: usize,
    pub needs_fix: usize,
    pub confirmed: usize,
    pub failed: usize,
}

impl StatusCounts {
    pub fn total(&self) -> usize {
        self.pending + self.resolved + self.needs_fix + self.confirmed + self.failed
    }

    /// 全部站点已确认或失败
    pub fn all_settled(&self) -> bool {
        self.pending == 0 && self.resolved == 0 && self.needs_fix == 0
    }
}
