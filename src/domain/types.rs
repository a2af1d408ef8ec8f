// ==========================================
// 智能配送路由系统 - 领域类型定义
// ==========================================
// 职责: 站点解析状态 / 全局阶段 及其转换表
// 红线: 状态转换必须经过转换表校验,禁止直接赋值跳转
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 站点解析状态 (Stop Status)
// ==========================================
// 序列化格式: SCREAMING_SNAKE_CASE
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StopStatus {
    Pending,   // 待解析
    Resolved,  // 已解析,待确认
    NeedsFix,  // 需人工修正
    Confirmed, // 已确认(终态)
    Failed,    // 修正次数耗尽(终态)
}

impl StopStatus {
    /// 是否允许从当前状态转换到 `next`
    ///
    /// 转换表:
    /// - Pending   → Resolved / NeedsFix / Confirmed(隐式确认)
    /// - NeedsFix  → Resolved / NeedsFix / Confirmed(隐式确认) / Failed
    /// - Resolved  → Confirmed / NeedsFix(人工重开)
    /// - Confirmed → NeedsFix(人工重开)
    /// - Failed    → NeedsFix(人工重开)
    pub fn can_transition_to(self, next: StopStatus) -> bool {
        use StopStatus::*;
        matches!(
            (self, next),
            (Pending, Resolved)
                | (Pending, NeedsFix)
                | (Pending, Confirmed)
                | (NeedsFix, Resolved)
                | (NeedsFix, NeedsFix)
                | (NeedsFix, Confirmed)
                | (NeedsFix, Failed)
                | (Resolved, Confirmed)
                | (Resolved, NeedsFix)
                | (Confirmed, NeedsFix)
                | (Failed, NeedsFix)
        )
    }
}

impl fmt::Display for StopStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopStatus::Pending => write!(f, "PENDING"),
            StopStatus::Resolved => write!(f, "RESOLVED"),
            StopStatus::NeedsFix => write!(f, "NEEDS_FIX"),
            StopStatus::Confirmed => write!(f, "CONFIRMED"),
            StopStatus::Failed => write!(f, "FAILED"),
        }
    }
}

// ==========================================
// 全局阶段 (Workflow Phase)
// ==========================================
// 顺序: Uploading → Resolving → AwaitingFixes → AllConfirmed → Assigning → Done
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkflowPhase {
    Uploading,     // 已创建,等待导入
    Resolving,     // 批量解析中(或被中止,仍有待解析站点)
    AwaitingFixes, // 等待人工修正/确认
    AllConfirmed,  // 全部确认,可分配
    Assigning,     // 聚类分配中
    Done,          // 分配完成
}

impl WorkflowPhase {
    /// 是否允许从当前阶段推进到 `next`
    ///
    /// 人工修正/重开会让阶段回退到 Resolving 之后的任一"未完成"阶段,
    /// 因此 AllConfirmed / Done 允许回退到 AwaitingFixes;
    /// 分配失效时 Done 回退到 AllConfirmed。
    pub fn can_advance_to(self, next: WorkflowPhase) -> bool {
        use WorkflowPhase::*;
        if self == next {
            return true;
        }
        matches!(
            (self, next),
            (Uploading, Resolving)
                | (Resolving, AwaitingFixes)
                | (Resolving, AllConfirmed)
                | (AwaitingFixes, Resolving)
                | (AwaitingFixes, AllConfirmed)
                | (AllConfirmed, AwaitingFixes)
                | (AllConfirmed, Assigning)
                | (Assigning, Done)
                | (Assigning, AllConfirmed)
                | (Done, AwaitingFixes)
                | (Done, AllConfirmed)
                | (Done, Assigning)
        )
    }
}

impl fmt::Display for WorkflowPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkflowPhase::Uploading => write!(f, "UPLOADING"),
            WorkflowPhase::Resolving => write!(f, "RESOLVING"),
            WorkflowPhase::AwaitingFixes => write!(f, "AWAITING_FIXES"),
            WorkflowPhase::AllConfirmed => write!(f, "ALL_CONFIRMED"),
            WorkflowPhase::Assigning => write!(f, "ASSIGNING"),
            WorkflowPhase::Done => write!(f, "DONE"),
        }
    }
}

// ==========================================
// 导入模板 (Input Schema)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputSchema {
    /// 仅要求 Client / Address
    #[default]
    Minimal,
    /// 标准模板: Client / Address / Start Time / End Time / Time Type / Order and Weight
    Extended,
}

impl InputSchema {
    /// 模板要求的列
    pub fn required_columns(self) -> &'static [&'static str] {
        match self {
            InputSchema::Minimal => &["Client", "Address"],
            InputSchema::Extended => &[
                "Client",
                "Address",
                "Start Time",
                "End Time",
                "Time Type",
                "Order and Weight",
            ],
        }
    }
}

impl fmt::Display for InputSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputSchema::Minimal => write!(f, "minimal"),
            InputSchema::Extended => write!(f, "extended"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stop_status_transition_table() {
        assert!(StopStatus::Pending.can_transition_to(StopStatus::Resolved));
        assert!(StopStatus::Pending.can_transition_to(StopStatus::NeedsFix));
        assert!(StopStatus::NeedsFix.can_transition_to(StopStatus::NeedsFix));
        assert!(StopStatus::NeedsFix.can_transition_to(StopStatus::Failed));
        assert!(StopStatus::Resolved.can_transition_to(StopStatus::Confirmed));

        assert!(!StopStatus::Pending.can_transition_to(StopStatus::Failed));
        assert!(!StopStatus::Confirmed.can_transition_to(StopStatus::Resolved));
        assert!(!StopStatus::Failed.can_transition_to(StopStatus::Resolved));
        assert!(!StopStatus::Resolved.can_transition_to(StopStatus::Pending));
    }

    #[test]
    fn test_phase_cannot_skip_ahead() {
        assert!(WorkflowPhase::Uploading.can_advance_to(WorkflowPhase::Resolving));
        assert!(!WorkflowPhase::Uploading.can_advance_to(WorkflowPhase::Assigning));
        assert!(!WorkflowPhase::AwaitingFixes.can_advance_to(WorkflowPhase::Assigning));
        assert!(WorkflowPhase::AllConfirmed.can_advance_to(WorkflowPhase::Assigning));
    }

    #[test]
    fn test_display_format() {
        assert_eq!(StopStatus::NeedsFix.to_string(), "NEEDS_FIX");
        assert_eq!(WorkflowPhase::AwaitingFixes.to_string(), "AWAITING_FIXES");
        assert_eq!(InputSchema::Extended.required_columns().len(), 6);
    }
}
