// ==========================================
// 智能配送路由系统 - 解析会话上下文
// ==========================================
// 职责: 站点集合 + 全局阶段 + 暂存修正 + 分配结果
// 生命周期: 导入时创建 → 经流程接口变更 → 完成后丢弃
// ==========================================

use crate::domain::assignment::Assignment;
use crate::domain::stop::{InvalidStatusTransition, Stop, StopId};
use crate::domain::types::{StopStatus, WorkflowPhase};
use crate::engine::error::{ClusteringError, WorkflowError, WorkflowResult};
use crate::engine::workflow::types::{FixOutcome, FixRequest, StatusCounts, WorkflowPolicy};
use crate::geocoder::{GeocodeHit, GeocodeResult};
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info};
use uuid::Uuid;

// ==========================================
// WorkflowContext - 单次调度会话状态
// ==========================================
// 站点集合 + 全局阶段 + 暂存修正 + 分配结果
// 只读访问公开,写操作经由 ResolutionWorkflow 或本类型的受控方法
#[derive(Debug, Clone)]
pub struct WorkflowContext {
    session_id: String,
    created_at: DateTime<Utc>,
    phase: WorkflowPhase,
    policy: WorkflowPolicy,
    stops: Vec<Stop>,
    staged_fixes: BTreeMap<StopId, FixRequest>,
    assignment: Option<Assignment>,
}

impl WorkflowContext {
    pub fn new(policy: WorkflowPolicy) -> Self {
        Self {
            session_id: Uuid::new_v4().to_string(),
            created_at: Utc::now(),
            phase: WorkflowPhase::Uploading,
            policy,
            stops: Vec::new(),
            staged_fixes: BTreeMap::new(),
            assignment: None,
        }
    }

    // ==========================================
    // 只读访问
    // ==========================================

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn phase(&self) -> WorkflowPhase {
        self.phase
    }

    pub fn policy(&self) -> WorkflowPolicy {
        self.policy
    }

    pub fn stops(&self) -> &[Stop] {
        &self.stops
    }

    pub fn stop(&self, id: StopId) -> Option<&Stop> {
        self.stops.get(id.index()).filter(|s| s.id == id)
    }

    pub fn assignment(&self) -> Option<&Assignment> {
        self.assignment.as_ref()
    }

    pub fn staged_fixes(&self) -> &BTreeMap<StopId, FixRequest> {
        &self.staged_fixes
    }

    pub fn counts(&self) -> StatusCounts {
        let mut counts = StatusCounts::default();
        for stop in &self.stops {
            match stop.status() {
                StopStatus::Pending => counts.pending += 1,
                StopStatus::Resolved => counts.resolved += 1,
                StopStatus::NeedsFix => counts.needs_fix += 1,
                StopStatus::Confirmed => counts.confirmed += 1,
                StopStatus::Failed => counts.failed += 1,
            }
        }
        counts
    }

    /// 可参与分配的站点(已确认;隐式确认模式下已解析亦可)
    pub fn valid_stops(&self) -> Vec<&Stop> {
        self.stops
            .iter()
            .filter(|s| match s.status() {
                StopStatus::Confirmed => true,
                StopStatus::Resolved => !self.policy.require_explicit_confirmation,
                _ => false,
            })
            .collect()
    }

    pub fn stops_with_status(&self, status: StopStatus) -> Vec<&Stop> {
        self.stops.iter().filter(|s| s.status() == status).collect()
    }

    // ==========================================
    // 导入
    // ==========================================

    /// 载入导入结果(仅 Uploading 阶段,且只能载入一次)
    pub fn ingest(&mut self, stops: Vec<Stop>) -> WorkflowResult<()> {
        self.ensure_phase(&[WorkflowPhase::Uploading], "UPLOADING")?;
        if !self.stops.is_empty() {
            return Err(WorkflowError::InvalidPhase {
                expected: "UPLOADING (空会话)".to_string(),
                actual: self.phase,
            });
        }
        if stops.is_empty() {
            return Err(WorkflowError::NoStops);
        }

        // StopId 必须等于下标
        self.stops = stops
            .into_iter()
            .enumerate()
            .map(|(idx, mut stop)| {
                stop.id = StopId(idx);
                stop
            })
            .collect();

        info!(session = %self.session_id, stops = self.stops.len(), "站点已载入");
        Ok(())
    }

    // ==========================================
    // 人工操作: 暂存修正 / 确认 / 重开
    // ==========================================

    /// 暂存一条修正(批量提交前可覆盖)
    pub fn stage_fix(&mut self, id: StopId, request: FixRequest) -> WorkflowResult<()> {
        self.ensure_interactive()?;
        self.fix_text(id, &request)?;
        self.staged_fixes.insert(id, request);
        Ok(())
    }

    pub fn unstage_fix(&mut self, id: StopId) -> Option<FixRequest> {
        self.staged_fixes.remove(&id)
    }

    /// 确认单个 Resolved 站点
    pub fn confirm(&mut self, id: StopId) -> WorkflowResult<()> {
        self.ensure_interactive()?;
        self.stop_mut(id)?.confirm()?;
        debug!(stop = %id, "站点已确认");
        self.refresh_phase()?;
        Ok(())
    }

    /// 确认全部 Resolved 站点,返回确认数量
    pub fn confirm_all(&mut self) -> WorkflowResult<usize> {
        self.ensure_interactive()?;
        let mut confirmed = 0;
        for stop in self.stops.iter_mut() {
            if stop.status() == StopStatus::Resolved {
                stop.confirm()?;
                confirmed += 1;
            }
        }
        info!(session = %self.session_id, confirmed, "批量确认完成");
        self.refresh_phase()?;
        Ok(confirmed)
    }

    /// 重开站点: 清除坐标 → NeedsFix,旧分配失效
    pub fn reopen(&mut self, id: StopId) -> WorkflowResult<()> {
        self.ensure_interactive()?;
        self.stop_mut(id)?.reopen()?;
        self.staged_fixes.remove(&id);
        if self.assignment.take().is_some() {
            info!(session = %self.session_id, stop = %id, "站点重开,分配结果已失效");
        }
        self.refresh_phase()?;
        Ok(())
    }

    // ==========================================
    // 阶段推进
    // ==========================================

    /// 根据站点状态重新计算全局阶段
    ///
    /// Uploading / Assigning 由流程显式推进,此处不变
    pub fn refresh_phase(&mut self) -> WorkflowResult<WorkflowPhase> {
        if matches!(self.phase, WorkflowPhase::Uploading | WorkflowPhase::Assigning) {
            return Ok(self.phase);
        }

        if self.assignment.is_some() && !self.assignment_is_current() {
            self.assignment = None;
            info!(session = %self.session_id, "站点坐标已变化,分配结果失效");
        }

        let counts = self.counts();
        let target = if counts.pending > 0 {
            WorkflowPhase::Resolving
        } else if !self.assignable(&counts) {
            WorkflowPhase::AwaitingFixes
        } else if self.assignment.is_some() && self.phase == WorkflowPhase::Done {
            WorkflowPhase::Done
        } else {
            WorkflowPhase::AllConfirmed
        };

        self.set_phase(target)?;
        Ok(target)
    }

    /// 无待处理站点且至少一个有效站点
    fn assignable(&self, counts: &StatusCounts) -> bool {
        let unconfirmed_blocks = self.policy.require_explicit_confirmation && counts.resolved > 0;
        counts.pending == 0
            && counts.needs_fix == 0
            && !unconfirmed_blocks
            && counts.confirmed + counts.resolved > 0
    }

    fn assignment_is_current(&self) -> bool {
        match &self.assignment {
            Some(assignment) => {
                let valid: BTreeSet<StopId> = self.valid_stops().iter().map(|s| s.id).collect();
                let assigned: BTreeSet<StopId> = assignment.iter().map(|(id, _)| id).collect();
                valid == assigned && assignment.is_current_for(&self.stops)
            }
            None => false,
        }
    }

    pub(crate) fn set_phase(&mut self, next: WorkflowPhase) -> WorkflowResult<()> {
        if !self.phase.can_advance_to(next) {
            return Err(WorkflowError::InvalidPhaseTransition {
                from: self.phase,
                to: next,
            });
        }
        if self.phase != next {
            debug!(session = %self.session_id, from = %self.phase, to = %next, "阶段变更");
        }
        self.phase = next;
        Ok(())
    }

    // ==========================================
    // 分配阶段
    // ==========================================

    /// 进入 Assigning
    ///
    /// # 返回
    /// - Err(ClusteringPrecondition(EmptyValidSet)): 全部站点已结清但无有效站点
    /// - Err(InvalidPhase): 仍有站点未结清
    pub(crate) fn begin_assignment(&mut self) -> WorkflowResult<()> {
        let phase = self.refresh_phase()?;
        let counts = self.counts();
        if counts.all_settled() && counts.total() > 0 && counts.confirmed == 0 {
            return Err(ClusteringError::EmptyValidSet.into());
        }
        if !matches!(phase, WorkflowPhase::AllConfirmed | WorkflowPhase::Done) {
            return Err(WorkflowError::InvalidPhase {
                expected: "ALL_CONFIRMED".to_string(),
                actual: phase,
            });
        }
        self.set_phase(WorkflowPhase::Assigning)
    }

    pub(crate) fn complete_assignment(&mut self, assignment: Assignment) -> WorkflowResult<()> {
        self.ensure_phase(&[WorkflowPhase::Assigning], "ASSIGNING")?;
        self.assignment = Some(assignment);
        self.set_phase(WorkflowPhase::Done)
    }

    /// 分配失败: 回到 AllConfirmed,保留原分配状态为空
    pub(crate) fn abort_assignment(&mut self) -> WorkflowResult<()> {
        self.ensure_phase(&[WorkflowPhase::Assigning], "ASSIGNING")?;
        self.assignment = None;
        self.set_phase(WorkflowPhase::AllConfirmed)
    }

    // ==========================================
    // 解析结果写回
    // ==========================================

    /// 写回批量解析结果(原子替换整条站点)
    pub(crate) fn apply_resolution(&mut self, mut updated: Stop) -> WorkflowResult<()> {
        let id = updated.id;
        let current = self.stop(id).ok_or(WorkflowError::StopNotFound(id))?;
        if current.status() != StopStatus::Pending {
            return Err(InvalidStatusTransition {
                stop: id,
                from: current.status(),
                to: updated.status(),
            }
            .into());
        }

        if updated.status() == StopStatus::Resolved && !self.policy.require_explicit_confirmation {
            updated.confirm()?;
        }
        self.stops[id.index()] = updated;
        Ok(())
    }

    /// 写回人工修正结果
    pub(crate) fn apply_fix_result(
        &mut self,
        id: StopId,
        fix_text: &str,
        result: GeocodeResult<GeocodeHit>,
    ) -> WorkflowResult<FixOutcome> {
        let policy = self.policy;
        let stop = self.stop_mut(id)?;

        match result {
            Ok(hit) => {
                let location = hit.into_location();
                stop.apply_fix(fix_text, location.clone())?;
                if !policy.require_explicit_confirmation {
                    stop.confirm()?;
                }
                info!(stop = %id, fix = %fix_text, label = %location.label, "人工修正成功");
                Ok(FixOutcome::Resolved { stop: id, location })
            }
            Err(e) => {
                stop.record_failed_fix(policy.max_fix_attempts)?;
                let attempts = stop.fix_attempts();
                info!(stop = %id, fix = %fix_text, attempts, error = %e, "人工修正未命中");
                if stop.status() == StopStatus::Failed {
                    Ok(FixOutcome::Failed { stop: id, attempts })
                } else {
                    Ok(FixOutcome::StillUnresolved { stop: id, attempts })
                }
            }
        }
    }

    /// 校验修正请求并返回修正文本
    pub(crate) fn fix_text(&self, id: StopId, request: &FixRequest) -> WorkflowResult<String> {
        let stop = self.stop(id).ok_or(WorkflowError::StopNotFound(id))?;
        if stop.status() != StopStatus::NeedsFix {
            return Err(InvalidStatusTransition {
                stop: id,
                from: stop.status(),
                to: StopStatus::Resolved,
            }
            .into());
        }

        match request {
            FixRequest::Suggestion(index) => stop
                .suggestions
                .get(*index)
                .cloned()
                .ok_or(WorkflowError::SuggestionOutOfRange {
                    stop: id,
                    index: *index,
                    available: stop.suggestions.len(),
                }),
            FixRequest::Manual(text) => {
                let text = text.trim();
                if text.is_empty() {
                    Err(WorkflowError::EmptyFix(id))
                } else {
                    Ok(text.to_string())
                }
            }
        }
    }

    pub(crate) fn take_staged_fixes(&mut self) -> BTreeMap<StopId, FixRequest> {
        std::mem::take(&mut self.staged_fixes)
    }

    fn stop_mut(&mut self, id: StopId) -> WorkflowResult<&mut Stop> {
        self.stops
            .get_mut(id.index())
            .filter(|s| s.id == id)
            .ok_or(WorkflowError::StopNotFound(id))
    }

    fn ensure_phase(&self, allowed: &[WorkflowPhase], expected: &str) -> WorkflowResult<()> {
        if allowed.contains(&self.phase) {
            Ok(())
        } else {
            Err(WorkflowError::InvalidPhase {
                expected: expected.to_string(),
                actual: self.phase,
            })
        }
    }

    /// 人工操作允许的阶段
    pub(crate) fn ensure_interactive(&self) -> WorkflowResult<()> {
        self.ensure_phase(
            &[
                WorkflowPhase::Resolving,
                WorkflowPhase::AwaitingFixes,
                WorkflowPhase::AllConfirmed,
                WorkflowPhase::Done,
            ],
            "RESOLVING/AWAITING_FIXES/ALL_CONFIRMED/DONE",
        )
    }
}
