use super::*;
use crate::config::{ClusteringConfig, RegionConfig};
use crate::domain::stop::{Coordinates, RawStopRecord, Stop, StopId};
use crate::domain::types::{StopStatus, WorkflowPhase};
use crate::engine::address_resolver::AddressResolver;
use crate::engine::error::{ClusteringError, WorkflowError};
use crate::engine::truck_assigner::TruckAssigner;
use crate::geocoder::{GeocodeError, GeocodeHit, GeocodeProvider, GeocodeResult, RegionFilter};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

// ==========================================
// 测试辅助
// ==========================================

/// 按查询文本应答的地理编码服务
struct TableProvider {
    answers: HashMap<String, (f64, f64)>,
    suggestions: Vec<String>,
    calls: AtomicUsize,
}

impl TableProvider {
    fn new(entries: &[(&str, f64, f64)]) -> Self {
        Self {
            answers: entries
                .iter()
                .map(|(q, lat, lon)| (q.to_string(), (*lat, *lon)))
                .collect(),
            suggestions: vec!["Mango Avenue, Cebu City, Philippines".to_string()],
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl GeocodeProvider for TableProvider {
    fn name(&self) -> &str {
        "table"
    }

    async fn resolve(&self, query: &str) -> GeocodeResult<GeocodeHit> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.answers.get(query) {
            Some((lat, lon)) => Ok(GeocodeHit {
                coordinates: Coordinates::new(*lat, *lon),
                label: query.to_string(),
                provider: "table".to_string(),
            }),
            None => Err(GeocodeError::not_found("table", query)),
        }
    }

    async fn suggest(&self, _query: &str, max_results: usize, _region: &RegionFilter) -> Vec<String> {
        self.suggestions.iter().take(max_results).cloned().collect()
    }
}

/// 记录并发数的慢速服务: 任意查询都命中,含 slow_marker 的查询延迟返回
struct PacedProvider {
    slow_marker: &'static str,
    delay: Duration,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
    slow_started: Notify,
}

impl PacedProvider {
    fn new(slow_marker: &'static str, delay: Duration) -> Self {
        Self {
            slow_marker,
            delay,
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            slow_started: Notify::new(),
        }
    }
}

#[async_trait]
impl GeocodeProvider for PacedProvider {
    fn name(&self) -> &str {
        "paced"
    }

    async fn resolve(&self, query: &str) -> GeocodeResult<GeocodeHit> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);

        if query.contains(self.slow_marker) {
            self.slow_started.notify_one();
            tokio::time::sleep(self.delay).await;
        } else {
            tokio::task::yield_now().await;
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(GeocodeHit {
            coordinates: Coordinates::new(10.3, 123.9),
            label: query.to_string(),
            provider: "paced".to_string(),
        })
    }

    async fn suggest(&self, _query: &str, _max_results: usize, _region: &RegionFilter) -> Vec<String> {
        Vec::new()
    }
}

fn paced_workflow(provider: Arc<PacedProvider>, max_concurrency: usize) -> ResolutionWorkflow {
    let resolver = Arc::new(AddressResolver::new(vec![provider as Arc<dyn GeocodeProvider>], &RegionConfig::default(), true));
    ResolutionWorkflow::new(resolver, TruckAssigner::new(ClusteringConfig::default()), implicit(), max_concurrency)
}

fn stop(idx: usize, address: &str) -> Stop {
    Stop::new(
        StopId(idx),
        RawStopRecord {
            row_number: idx + 2,
            client: format!("Client {}", idx),
            address: address.to_string(),
            weight_kg: 5.0,
            extra_fields: BTreeMap::new(),
        },
    )
}

fn known_addresses() -> Vec<(&'static str, f64, f64)> {
    vec![
        ("Osmena Blvd, Cebu, Philippines", 10.30, 123.89),
        ("Colon St, Cebu, Philippines", 10.29, 123.90),
        ("AS Fortuna St, Cebu, Philippines", 10.33, 123.93),
        ("Mandaue City Hall, Cebu, Philippines", 10.35, 123.94),
        ("Mango Avenue, Cebu City, Philippines", 10.31, 123.89),
    ]
}

fn workflow_with(provider: Arc<TableProvider>, policy: WorkflowPolicy) -> ResolutionWorkflow {
    let resolver = Arc::new(AddressResolver::new(vec![provider as Arc<dyn GeocodeProvider>], &RegionConfig::default(), true));
    ResolutionWorkflow::new(resolver, TruckAssigner::new(ClusteringConfig::default()), policy, 2)
}

fn implicit() -> WorkflowPolicy {
    WorkflowPolicy {
        require_explicit_confirmation: false,
        max_fix_attempts: Some(2),
    }
}

fn explicit() -> WorkflowPolicy {
    WorkflowPolicy {
        require_explicit_confirmation: true,
        max_fix_attempts: None,
    }
}

fn session(workflow: &ResolutionWorkflow, addresses: &[&str]) -> WorkflowContext {
    let mut ctx = workflow.new_context();
    let stops = addresses.iter().enumerate().map(|(i, a)| stop(i, a)).collect();
    ctx.ingest(stops).unwrap();
    ctx
}

// ==========================================
// 测试用例
// ==========================================

#[tokio::test]
async fn test_resolve_all_implicit_confirmation_reaches_all_confirmed() {
    let workflow = workflow_with(Arc::new(TableProvider::new(&known_addresses())), implicit());
    let mut ctx = session(&workflow, &["Osmena Blvd", "Colon St", "AS Fortuna St"]);

    let summary = workflow.resolve_all(&mut ctx, &CancellationToken::new()).await.unwrap();

    assert_eq!(summary.attempted, 3);
    assert_eq!(summary.resolved, 3);
    assert!(!summary.cancelled);
    assert_eq!(ctx.phase(), WorkflowPhase::AllConfirmed);
    assert!(ctx.stops().iter().all(|s| s.status() == StopStatus::Confirmed));
}

#[tokio::test]
async fn test_explicit_confirmation_blocks_assignment_until_confirmed() {
    let workflow = workflow_with(Arc::new(TableProvider::new(&known_addresses())), explicit());
    let mut ctx = session(&workflow, &["Osmena Blvd", "Colon St"]);

    workflow.resolve_all(&mut ctx, &CancellationToken::new()).await.unwrap();
    assert_eq!(ctx.phase(), WorkflowPhase::AwaitingFixes);

    let err = workflow.assign(&mut ctx, 1).unwrap_err();
    assert!(matches!(err, WorkflowError::InvalidPhase { .. }));

    ctx.confirm(StopId(0)).unwrap();
    assert_eq!(ctx.phase(), WorkflowPhase::AwaitingFixes);
    assert_eq!(ctx.confirm_all().unwrap(), 1);
    assert_eq!(ctx.phase(), WorkflowPhase::AllConfirmed);
}

#[tokio::test]
async fn test_needs_fix_then_suggestion_resolves() {
    let workflow = workflow_with(Arc::new(TableProvider::new(&known_addresses())), implicit());
    let mut ctx = session(&workflow, &["Osmena Blvd", "Mango Ave"]);

    workflow.resolve_all(&mut ctx, &CancellationToken::new()).await.unwrap();
    let broken = ctx.stop(StopId(1)).unwrap();
    assert_eq!(broken.status(), StopStatus::NeedsFix);
    assert!(broken.coordinates().is_none());
    assert_eq!(broken.suggestions.len(), 1);
    assert_eq!(ctx.phase(), WorkflowPhase::AwaitingFixes);

    let outcome = workflow
        .submit_fix(&mut ctx, StopId(1), FixRequest::Suggestion(0))
        .await
        .unwrap();

    assert!(outcome.is_resolved());
    let fixed = ctx.stop(StopId(1)).unwrap();
    assert_eq!(fixed.status(), StopStatus::Confirmed);
    assert_eq!(fixed.latitude(), Some(10.31));
    assert_eq!(fixed.fixed_address.as_deref(), Some("Mango Avenue, Cebu City, Philippines"));
    assert_eq!(ctx.phase(), WorkflowPhase::AllConfirmed);
}

#[tokio::test]
async fn test_invalid_fix_requests_rejected() {
    let workflow = workflow_with(Arc::new(TableProvider::new(&known_addresses())), implicit());
    let mut ctx = session(&workflow, &["Osmena Blvd", "Mango Ave"]);
    workflow.resolve_all(&mut ctx, &CancellationToken::new()).await.unwrap();

    let out_of_range = workflow
        .submit_fix(&mut ctx, StopId(1), FixRequest::Suggestion(3))
        .await
        .unwrap_err();
    assert!(matches!(out_of_range, WorkflowError::SuggestionOutOfRange { index: 3, .. }));

    let blank = ctx.stage_fix(StopId(1), FixRequest::Manual("   ".to_string())).unwrap_err();
    assert_eq!(blank, WorkflowError::EmptyFix(StopId(1)));

    // 已确认站点不能修正
    let confirmed = ctx.stage_fix(StopId(0), FixRequest::Manual("Colon St".to_string()));
    assert!(matches!(confirmed, Err(WorkflowError::InvalidTransition(_))));

    let missing = ctx.stage_fix(StopId(9), FixRequest::Suggestion(0)).unwrap_err();
    assert_eq!(missing, WorkflowError::StopNotFound(StopId(9)));
}

#[tokio::test]
async fn test_failed_fixes_hit_cap_and_stop_is_excluded() {
    let workflow = workflow_with(Arc::new(TableProvider::new(&known_addresses())), implicit());
    let mut ctx = session(&workflow, &["Osmena Blvd", "Nowhere"]);
    workflow.resolve_all(&mut ctx, &CancellationToken::new()).await.unwrap();

    let first = workflow
        .submit_fix(&mut ctx, StopId(1), FixRequest::Manual("Still Nowhere".to_string()))
        .await
        .unwrap();
    assert_eq!(first, FixOutcome::StillUnresolved { stop: StopId(1), attempts: 1 });

    let second = workflow
        .submit_fix(&mut ctx, StopId(1), FixRequest::Manual("Nowhere Again".to_string()))
        .await
        .unwrap();
    assert_eq!(second, FixOutcome::Failed { stop: StopId(1), attempts: 2 });

    assert_eq!(ctx.phase(), WorkflowPhase::AllConfirmed);
    assert_eq!(ctx.valid_stops().len(), 1);

    let assignment = workflow.assign(&mut ctx, 1).unwrap();
    assert_eq!(assignment.len(), 1);
    assert_eq!(assignment.truck_of(StopId(1)), None);
}

#[tokio::test]
async fn test_staged_fixes_applied_together() {
    let workflow = workflow_with(Arc::new(TableProvider::new(&known_addresses())), implicit());
    let mut ctx = session(&workflow, &["Mango Ave", "Bad Colon", "Osmena Blvd"]);
    workflow.resolve_all(&mut ctx, &CancellationToken::new()).await.unwrap();
    assert_eq!(ctx.counts().needs_fix, 2);

    ctx.stage_fix(StopId(0), FixRequest::Suggestion(0)).unwrap();
    ctx.stage_fix(StopId(1), FixRequest::Manual("Colon St".to_string())).unwrap();
    assert_eq!(ctx.staged_fixes().len(), 2);

    let outcomes = workflow.apply_staged_fixes(&mut ctx).await.unwrap();

    assert_eq!(outcomes.len(), 2);
    assert!(outcomes.iter().all(FixOutcome::is_resolved));
    assert_eq!(outcomes[0].stop(), StopId(0));
    assert!(ctx.staged_fixes().is_empty());
    assert_eq!(ctx.phase(), WorkflowPhase::AllConfirmed);
}

#[tokio::test]
async fn test_cancelled_before_start_keeps_stops_pending() {
    let provider = Arc::new(TableProvider::new(&known_addresses()));
    let workflow = workflow_with(provider.clone(), implicit());
    let mut ctx = session(&workflow, &["Osmena Blvd", "Colon St"]);

    let cancel = CancellationToken::new();
    cancel.cancel();
    let summary = workflow.resolve_all(&mut ctx, &cancel).await.unwrap();

    assert!(summary.cancelled);
    assert_eq!(summary.skipped, 2);
    assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    assert_eq!(ctx.phase(), WorkflowPhase::Resolving);
    assert_eq!(ctx.counts().pending, 2);

    // 重新调用继续处理
    let resumed = workflow.resolve_all(&mut ctx, &CancellationToken::new()).await.unwrap();
    assert_eq!(resumed.resolved, 2);
    assert_eq!(ctx.phase(), WorkflowPhase::AllConfirmed);
}

#[tokio::test]
async fn test_resolve_all_never_exceeds_max_concurrency() {
    let provider = Arc::new(PacedProvider::new("Slow", Duration::from_millis(20)));
    let workflow = paced_workflow(provider.clone(), 3);
    let addresses: Vec<String> = (0..10).map(|i| format!("Slow St {}", i)).collect();
    let refs: Vec<&str> = addresses.iter().map(String::as_str).collect();
    let mut ctx = session(&workflow, &refs);

    let summary = workflow.resolve_all(&mut ctx, &CancellationToken::new()).await.unwrap();

    assert_eq!(summary.resolved, 10);
    assert_eq!(provider.peak.load(Ordering::SeqCst), 3);
    assert_eq!(provider.in_flight.load(Ordering::SeqCst), 0);
    assert_eq!(ctx.phase(), WorkflowPhase::AllConfirmed);
}

#[tokio::test]
async fn test_cancel_mid_batch_leaves_every_stop_consistent() {
    let provider = Arc::new(PacedProvider::new("Slow", Duration::from_millis(200)));
    let workflow = paced_workflow(provider.clone(), 2);
    let mut ctx = session(
        &workflow,
        &[
            "Fast St 0", "Fast St 1", "Slow St 2", "Slow St 3", "Slow St 4", "Slow St 5", "Slow St 6",
            "Slow St 7",
        ],
    );

    // 第一个慢请求开始后中止
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    let watcher = provider.clone();
    let canceller = tokio::spawn(async move {
        watcher.slow_started.notified().await;
        trigger.cancel();
    });

    let summary = workflow.resolve_all(&mut ctx, &cancel).await.unwrap();
    canceller.await.unwrap();

    assert!(summary.cancelled);
    assert!(summary.skipped > 0);
    assert_eq!(summary.attempted + summary.skipped, 8);
    assert_eq!(ctx.phase(), WorkflowPhase::Resolving);

    for stop in ctx.stops() {
        match stop.status() {
            StopStatus::Pending => {
                assert!(stop.latitude().is_none());
                assert!(stop.longitude().is_none());
                assert!(stop.resolved_address().is_none());
            }
            StopStatus::Confirmed => {
                assert!(stop.latitude().is_some());
                assert!(stop.longitude().is_some());
                assert!(stop.resolved_address().is_some());
            }
            other => panic!("stop {} left in {:?}", stop.id, other),
        }
    }
    assert_eq!(ctx.stop(StopId(0)).unwrap().status(), StopStatus::Confirmed);
    assert_eq!(ctx.stop(StopId(7)).unwrap().status(), StopStatus::Pending);

    let resumed = workflow.resolve_all(&mut ctx, &CancellationToken::new()).await.unwrap();
    assert!(!resumed.cancelled);
    assert_eq!(resumed.resolved, summary.skipped);
    assert_eq!(ctx.counts().confirmed, 8);
    assert_eq!(ctx.phase(), WorkflowPhase::AllConfirmed);
}

#[tokio::test]
async fn test_reopen_invalidates_assignment() {
    let workflow = workflow_with(Arc::new(TableProvider::new(&known_addresses())), implicit());
    let mut ctx = session(&workflow, &["Osmena Blvd", "Colon St", "AS Fortuna St"]);
    workflow.resolve_all(&mut ctx, &CancellationToken::new()).await.unwrap();

    workflow.assign(&mut ctx, 2).unwrap();
    assert_eq!(ctx.phase(), WorkflowPhase::Done);
    assert!(ctx.assignment().is_some());

    ctx.reopen(StopId(2)).unwrap();
    assert!(ctx.assignment().is_none());
    assert_eq!(ctx.phase(), WorkflowPhase::AwaitingFixes);
    assert!(ctx.stop(StopId(2)).unwrap().coordinates().is_none());

    workflow
        .submit_fix(&mut ctx, StopId(2), FixRequest::Manual("Mandaue City Hall".to_string()))
        .await
        .unwrap();
    assert_eq!(ctx.phase(), WorkflowPhase::AllConfirmed);
}

#[tokio::test]
async fn test_assignment_precondition_errors_restore_phase() {
    let workflow = workflow_with(Arc::new(TableProvider::new(&known_addresses())), implicit());
    let mut ctx = session(&workflow, &["Osmena Blvd", "Colon St"]);
    workflow.resolve_all(&mut ctx, &CancellationToken::new()).await.unwrap();

    let err = workflow.assign(&mut ctx, 3).unwrap_err();
    assert_eq!(
        err,
        WorkflowError::ClusteringPrecondition(ClusteringError::TooManyTrucks { num_trucks: 3, stops: 2 })
    );
    assert_eq!(ctx.phase(), WorkflowPhase::AllConfirmed);

    let err = workflow.assign(&mut ctx, 0).unwrap_err();
    assert_eq!(err, WorkflowError::ClusteringPrecondition(ClusteringError::ZeroTrucks));
}

#[tokio::test]
async fn test_all_failed_reports_empty_valid_set() {
    let policy = WorkflowPolicy {
        require_explicit_confirmation: false,
        max_fix_attempts: Some(1),
    };
    let workflow = workflow_with(Arc::new(TableProvider::new(&known_addresses())), policy);
    let mut ctx = session(&workflow, &["Nowhere"]);
    workflow.resolve_all(&mut ctx, &CancellationToken::new()).await.unwrap();

    let outcome = workflow
        .submit_fix(&mut ctx, StopId(0), FixRequest::Manual("Still Nowhere".to_string()))
        .await
        .unwrap();
    assert!(matches!(outcome, FixOutcome::Failed { .. }));

    let err = workflow.assign(&mut ctx, 1).unwrap_err();
    assert_eq!(err, WorkflowError::ClusteringPrecondition(ClusteringError::EmptyValidSet));
}

#[tokio::test]
async fn test_resolve_all_rejected_after_resolution() {
    let workflow = workflow_with(Arc::new(TableProvider::new(&known_addresses())), implicit());
    let mut ctx = session(&workflow, &["Osmena Blvd"]);
    workflow.resolve_all(&mut ctx, &CancellationToken::new()).await.unwrap();

    let err = workflow.resolve_all(&mut ctx, &CancellationToken::new()).await.unwrap_err();
    assert!(matches!(err, WorkflowError::InvalidPhase { .. }));
}

#[test]
fn test_ingest_rejects_empty_and_second_batch() {
    let mut ctx = WorkflowContext::new(WorkflowPolicy::default());
    assert_eq!(ctx.ingest(Vec::new()), Err(WorkflowError::NoStops));

    ctx.ingest(vec![stop(0, "Osmena Blvd")]).unwrap();
    assert!(ctx.ingest(vec![stop(0, "Colon St")]).is_err());
    assert_eq!(ctx.phase(), WorkflowPhase::Uploading);
}
