// ==========================================
// 智能配送路由系统 - 调度 API
// ==========================================
// 职责: 组装导入 / 解析流程 / 分配 / 调度起点 / 导出,供 CLI 调用
// 会话: WorkflowContext 由调用方持有,API 本身无会话状态
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::config::{validate, DispatchConfig};
use crate::domain::assignment::{Assignment, DispatchPoint, DriverRoster};
use crate::domain::stop::{RawStopRecord, Stop, StopId};
use crate::engine::{
    AddressResolver, DispatchPointResolver, FixOutcome, FixRequest, ResolutionWorkflow,
    ResolveSummary, WorkflowContext,
};
use crate::export::{build_rows, ExportRow, ExportSink};
use crate::geocoder::{build_provider_chain, GeocodeProvider};
use crate::importer::StopImporter;
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument};

pub struct DispatchApi {
    config: DispatchConfig,
    importer: StopImporter,
    workflow: ResolutionWorkflow,
    dispatch_resolver: DispatchPointResolver,
}

impl DispatchApi {
    /// 按配置构建(真实地理编码服务)
    ///
    /// 先执行配置校验,限流 / 并发 / 超时等非法值在建链前拒绝
    pub fn from_config(config: DispatchConfig) -> ApiResult<Self> {
        validate(&config)?;
        let providers = build_provider_chain(&config)?;
        Ok(Self::with_providers(config, providers))
    }

    /// 使用指定的服务链构建
    ///
    /// # 参数
    /// - providers: 按优先级排序,最后一个为降级服务
    pub fn with_providers(config: DispatchConfig, providers: Vec<Arc<dyn GeocodeProvider>>) -> Self {
        let resolver = Arc::new(AddressResolver::new(
            providers,
            &config.region,
            config.workflow.accept_secondary_hits,
        ));

        Self {
            importer: StopImporter::new(config.schema),
            workflow: ResolutionWorkflow::from_config(resolver.clone(), &config),
            dispatch_resolver: DispatchPointResolver::new(resolver),
            config,
        }
    }

    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    // ==========================================
    // 导入
    // ==========================================

    /// 导入文件并创建会话
    #[instrument(skip(self, file_path))]
    pub fn ingest_file<P: AsRef<Path>>(&self, file_path: P) -> ApiResult<WorkflowContext> {
        let imported = self.importer.import_file(file_path)?;
        let mut ctx = self.workflow.new_context();
        ctx.ingest(imported.stops)?;
        info!(session = %ctx.session_id(), batch_id = %imported.batch_id, "会话已创建");
        Ok(ctx)
    }

    /// 以已映射的记录创建会话
    pub fn ingest_records(&self, records: Vec<RawStopRecord>) -> ApiResult<WorkflowContext> {
        for record in &records {
            if record.client.trim().is_empty() || record.address.trim().is_empty() {
                return Err(ApiError::InvalidInput(format!(
                    "第 {} 行 Client/Address 为空",
                    record.row_number
                )));
            }
        }

        let stops = records
            .into_iter()
            .enumerate()
            .map(|(idx, record)| Stop::new(StopId(idx), record))
            .collect();

        let mut ctx = self.workflow.new_context();
        ctx.ingest(stops)?;
        Ok(ctx)
    }

    // ==========================================
    // 解析与修正
    // ==========================================

    pub async fn resolve_all(
        &self,
        ctx: &mut WorkflowContext,
        cancel: &CancellationToken,
    ) -> ApiResult<ResolveSummary> {
        Ok(self.workflow.resolve_all(ctx, cancel).await?)
    }

    pub async fn submit_fix(
        &self,
        ctx: &mut WorkflowContext,
        stop: StopId,
        request: FixRequest,
    ) -> ApiResult<FixOutcome> {
        Ok(self.workflow.submit_fix(ctx, stop, request).await?)
    }

    pub fn stage_fix(&self, ctx: &mut WorkflowContext, stop: StopId, request: FixRequest) -> ApiResult<()> {
        Ok(ctx.stage_fix(stop, request)?)
    }

    pub async fn apply_staged_fixes(&self, ctx: &mut WorkflowContext) -> ApiResult<Vec<FixOutcome>> {
        Ok(self.workflow.apply_staged_fixes(ctx).await?)
    }

    pub fn confirm(&self, ctx: &mut WorkflowContext, stop: StopId) -> ApiResult<()> {
        Ok(ctx.confirm(stop)?)
    }

    pub fn confirm_all(&self, ctx: &mut WorkflowContext) -> ApiResult<usize> {
        Ok(ctx.confirm_all()?)
    }

    pub fn reopen(&self, ctx: &mut WorkflowContext, stop: StopId) -> ApiResult<()> {
        Ok(ctx.reopen(stop)?)
    }

    // ==========================================
    // 分配 / 调度起点 / 导出
    // ==========================================

    pub fn assign(&self, ctx: &mut WorkflowContext, num_trucks: usize) -> ApiResult<Assignment> {
        Ok(self.workflow.assign(ctx, num_trucks)?)
    }

    /// 解析调度起点,未指定地址时使用配置中的默认地址
    pub async fn resolve_dispatch_point(&self, address: Option<&str>) -> ApiResult<DispatchPoint> {
        let address = address.unwrap_or(&self.config.dispatch_address);
        Ok(self.dispatch_resolver.resolve(address).await?)
    }

    pub fn export_rows(&self, ctx: &WorkflowContext, roster: &DriverRoster) -> ApiResult<Vec<ExportRow>> {
        Ok(build_rows(ctx, roster)?)
    }

    pub fn export(&self, ctx: &WorkflowContext, roster: &DriverRoster, sink: &dyn ExportSink) -> ApiResult<usize> {
        let rows = build_rows(ctx, roster)?;
        sink.export(&rows)?;
        Ok(rows.len())
    }
}
