// ==========================================
// 智能配送路由系统 - 解析流程编排
// ==========================================
// 职责: 批量解析 / 人工修正 / 车辆分配 的驱动
// 输入: WorkflowContext(由调用方持有)
// ==========================================

use crate::config::DispatchConfig;
use crate::domain::assignment::Assignment;
use crate::domain::stop::{Stop, StopId};
use crate::domain::types::{StopStatus, WorkflowPhase};
use crate::engine::address_resolver::AddressResolver;
use crate::engine::error::{WorkflowError, WorkflowResult};
use crate::engine::truck_assigner::TruckAssigner;
use crate::engine::workflow::context::WorkflowContext;
use crate::engine::workflow::types::{FixOutcome, FixRequest, ResolveSummary, WorkflowPolicy};
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

// ==========================================
// ResolutionWorkflow - 解析流程编排
// ==========================================
pub struct ResolutionWorkflow {
    resolver: Arc<AddressResolver>,
    assigner: TruckAssigner,
    policy: WorkflowPolicy,
    max_concurrency: usize,
}

impl ResolutionWorkflow {
    /// # 参数
    /// - resolver: 地址解析器(与调度起点解析共享)
    /// - assigner: 车辆分配器
    /// - policy: 确认策略 / 修正上限
    /// - max_concurrency: 并发解析站点数(最小为 1)
    pub fn new(
        resolver: Arc<AddressResolver>,
        assigner: TruckAssigner,
        policy: WorkflowPolicy,
        max_concurrency: usize,
    ) -> Self {
        Self {
            resolver,
            assigner,
            policy,
            max_concurrency: max_concurrency.max(1),
        }
    }

    pub fn from_config(resolver: Arc<AddressResolver>, config: &DispatchConfig) -> Self {
        Self::new(
            resolver,
            TruckAssigner::new(config.clustering.clone()),
            WorkflowPolicy::from(&config.workflow),
            config.max_concurrency,
        )
    }

    pub fn resolver(&self) -> &Arc<AddressResolver> {
        &self.resolver
    }

    pub fn policy(&self) -> WorkflowPolicy {
        self.policy
    }

    /// 新建会话(沿用本流程的策略)
    pub fn new_context(&self) -> WorkflowContext {
        WorkflowContext::new(self.policy)
    }

    /// 批量解析全部 Pending 站点
    ///
    /// 中止后已写回的结果保留,未处理站点保持 Pending,可再次调用继续
    #[instrument(skip(self, ctx, cancel), fields(session = %ctx.session_id()))]
    pub async fn resolve_all(
        &self,
        ctx: &mut WorkflowContext,
        cancel: &CancellationToken,
    ) -> WorkflowResult<ResolveSummary> {
        if !matches!(ctx.phase(), WorkflowPhase::Uploading | WorkflowPhase::Resolving) {
            return Err(WorkflowError::InvalidPhase {
                expected: "UPLOADING/RESOLVING".to_string(),
                actual: ctx.phase(),
            });
        }
        if ctx.stops().is_empty() {
            return Err(WorkflowError::NoStops);
        }
        ctx.set_phase(WorkflowPhase::Resolving)?;

        let pending: Vec<Stop> = ctx
            .stops_with_status(StopStatus::Pending)
            .into_iter()
            .cloned()
            .collect();

        info!(pending = pending.len(), concurrency = self.max_concurrency, "开始批量解析");

        let resolver = self.resolver.as_ref();
        let mut outcomes = stream::iter(pending.into_iter().map(|stop| async move {
            if cancel.is_cancelled() {
                return (stop.id, None);
            }
            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                r = resolver.resolve_stop(&stop) => Some(r),
            };
            (stop.id, result)
        }))
        .buffer_unordered(self.max_concurrency);

        let mut summary = ResolveSummary::default();
        while let Some((id, outcome)) = outcomes.next().await {
            match outcome {
                None => summary.skipped += 1,
                Some(Ok(updated)) => {
                    summary.attempted += 1;
                    if updated.status() == StopStatus::Resolved {
                        summary.resolved += 1;
                    } else {
                        summary.needs_fix += 1;
                    }
                    ctx.apply_resolution(updated)?;
                }
                Some(Err(e)) => {
                    warn!(stop = %id, error = %e, "站点解析结果无法写回");
                    summary.skipped += 1;
                }
            }
        }

        summary.cancelled = cancel.is_cancelled();
        let phase = ctx.refresh_phase()?;

        info!(
            attempted = summary.attempted,
            resolved = summary.resolved,
            needs_fix = summary.needs_fix,
            skipped = summary.skipped,
            cancelled = summary.cancelled,
            phase = %phase,
            "批量解析结束"
        );

        Ok(summary)
    }

    /// 提交单条修正(立即解析)
    pub async fn submit_fix(
        &self,
        ctx: &mut WorkflowContext,
        id: StopId,
        request: FixRequest,
    ) -> WorkflowResult<FixOutcome> {
        ctx.ensure_interactive()?;
        let text = ctx.fix_text(id, &request)?;
        ctx.unstage_fix(id);

        let mut outcomes = self.run_fixes(ctx, vec![(id, text)]).await?;
        outcomes.pop().ok_or(WorkflowError::StopNotFound(id))
    }

    /// 批量提交暂存的修正
    ///
    /// 全部请求先校验,任一无效则整体拒绝且暂存保持不变
    pub async fn apply_staged_fixes(&self, ctx: &mut WorkflowContext) -> WorkflowResult<Vec<FixOutcome>> {
        ctx.ensure_interactive()?;

        let mut jobs = Vec::with_capacity(ctx.staged_fixes().len());
        for (id, request) in ctx.staged_fixes() {
            jobs.push((*id, ctx.fix_text(*id, request)?));
        }
        ctx.take_staged_fixes();

        self.run_fixes(ctx, jobs).await
    }

    async fn run_fixes(
        &self,
        ctx: &mut WorkflowContext,
        jobs: Vec<(StopId, String)>,
    ) -> WorkflowResult<Vec<FixOutcome>> {
        if jobs.is_empty() {
            return Ok(Vec::new());
        }

        let resolver = self.resolver.as_ref();
        let results: Vec<_> = stream::iter(jobs.into_iter().map(|(id, text)| async move {
            let result = resolver.resolve_qualified(&text).await;
            (id, text, result)
        }))
        .buffer_unordered(self.max_concurrency)
        .collect()
        .await;

        let mut outcomes = Vec::with_capacity(results.len());
        for (id, text, result) in results {
            outcomes.push(ctx.apply_fix_result(id, &text, result)?);
        }
        outcomes.sort_by_key(|o| o.stop());

        ctx.refresh_phase()?;
        Ok(outcomes)
    }

    /// 对有效站点执行车辆分配
    ///
    /// 失败时阶段回到 AllConfirmed,错误原样上报
    #[instrument(skip(self, ctx), fields(session = %ctx.session_id()))]
    pub fn assign(&self, ctx: &mut WorkflowContext, num_trucks: usize) -> WorkflowResult<Assignment> {
        ctx.begin_assignment()?;

        let result = {
            let valid = ctx.valid_stops();
            self.assigner.assign(&valid, num_trucks)
        };

        match result {
            Ok(assignment) => {
                ctx.complete_assignment(assignment.clone())?;
                Ok(assignment)
            }
            Err(e) => {
                warn!(num_trucks, error = %e, "车辆分配失败");
                ctx.abort_assignment()?;
                Err(e.into())
            }
        }
    }
}
