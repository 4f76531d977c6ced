//! Authorization manager.
//!
//! Answers each authorization request within its time budget, then funds
//! approvals in the background:
//!
//! ```text
//! request ──▶ ledger admit ──▶ select (bounded) ──▶ decision ──▶ caller
//!                                                      │
//!                                                      └─▶ spawn charge ──▶ funding record
//! ```
//!
//! The decision is returned before the charge is awaited. A failed charge
//! is recorded next to the approval and logged; it never changes the
//! decision.
//!
//! Decided requests, settled funding records and their audit events are kept
//! for the retention window and dropped by [`AuthorizationManager::prune`].

use crate::audit::{AuditEvent, AuditEventKind, AuditLog};
use crate::funding::{FundingRecord, FundingTracker};
use crate::ledger::{Admission, RequestLedger};
use crate::metrics::Metrics;
use crate::{
    AuthorizationDecision, AuthorizationRequest, DecisionReason, EventOutcome,
    IncomingAuthorization, InteractiveError, IssuerEvent, Result, AUTHORIZATION_REQUEST_EVENT,
};
use cardpilot_lib::funding::{ChargeRequest, FundingExecutor, FundingTargets, HttpFundingExecutor};
use cardpilot_lib::merchant;
use cardpilot_lib::rankings::{load_rankings_file, RankingCatalog, WalletSignature};
use cardpilot_lib::selection::ValuationParams;
use cardpilot_lib::{
    CardpilotConfig, CardpilotError, NoMatch, RewardTable, SelectionResult, SessionContext,
    SessionRequest,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;
use tokio::task::JoinHandle;

const DEFAULT_TIME_BUDGET: Duration = Duration::from_millis(2000);
const DEFAULT_RETENTION: Duration = Duration::from_secs(24 * 60 * 60);

/// Entries removed by one pruning pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PruneReport {
    /// Decided request ids forgotten by the ledger.
    pub requests: usize,
    /// Settled funding records dropped.
    pub funding_records: usize,
    /// Audit events dropped.
    pub audit_events: usize,
}

/// Runs the approve-then-fund protocol for one wallet session at a time.
pub struct AuthorizationManager {
    session: RwLock<Arc<SessionContext>>,
    catalog: Arc<RankingCatalog>,
    funding_targets: FundingTargets,
    valuation: ValuationParams,
    executor: Arc<dyn FundingExecutor>,
    default_time_budget: Duration,
    retention: Duration,
    currency: String,
    ledger: RequestLedger,
    audit: Arc<AuditLog>,
    funding: Arc<FundingTracker>,
    metrics: Arc<Metrics>,
    last_selection: RwLock<Option<SelectionResult>>,
    tasks: Mutex<HashMap<String, JoinHandle<()>>>,
}

impl AuthorizationManager {
    /// Create a manager with an empty session. Until [`set_session`] is
    /// called every request is declined.
    ///
    /// [`set_session`]: Self::set_session
    pub fn new(catalog: Arc<RankingCatalog>, executor: Arc<dyn FundingExecutor>) -> Self {
        Self {
            session: RwLock::new(Arc::new(SessionContext::empty())),
            catalog,
            funding_targets: FundingTargets::default(),
            valuation: ValuationParams::default(),
            executor,
            default_time_budget: DEFAULT_TIME_BUDGET,
            retention: DEFAULT_RETENTION,
            currency: "usd".to_string(),
            ledger: RequestLedger::new(),
            audit: Arc::new(AuditLog::new()),
            funding: Arc::new(FundingTracker::new()),
            metrics: Arc::new(Metrics::new()),
            last_selection: RwLock::new(None),
            tasks: Mutex::new(HashMap::new()),
        }
    }

    /// Network-level funding targets applied to every session wallet.
    pub fn with_funding_targets(mut self, targets: FundingTargets) -> Self {
        self.funding_targets = targets;
        self
    }

    /// Valuation constants for every session.
    pub fn with_valuation(mut self, params: ValuationParams) -> Self {
        self.valuation = params;
        self
    }

    /// Deadline used when a request carries none.
    pub fn with_time_budget(mut self, budget: Duration) -> Self {
        self.default_time_budget = budget;
        self
    }

    /// How long decided requests stay deduplicated and settled records stay
    /// queryable.
    pub fn with_retention(mut self, retention: Duration) -> Self {
        self.retention = retention;
        self
    }

    /// Currency of funding charges.
    pub fn with_currency(mut self, currency: impl Into<String>) -> Self {
        self.currency = currency.into();
        self
    }

    /// Build a manager from process configuration, charging through the
    /// HTTP funding executor.
    ///
    /// Fails when the crate was built without `http-executor`: every
    /// approval would otherwise go unfunded.
    pub fn from_config(config: &CardpilotConfig) -> Result<Self> {
        config.validate().map_err(InteractiveError::Config)?;

        let funding = config.funding.clone().ok_or_else(|| {
            InteractiveError::Config(CardpilotError::Config(
                "funding section is required to run authorizations".into(),
            ))
        })?;
        if !HttpFundingExecutor::is_available() {
            return Err(InteractiveError::Config(CardpilotError::Config(
                "funding needs the HTTP client; enable the 'http-executor' feature".into(),
            )));
        }
        let currency = funding.currency.clone();
        let executor = HttpFundingExecutor::new(funding).map_err(InteractiveError::Config)?;

        let default_table = match &config.rankings_file {
            Some(path) => load_rankings_file(path).map_err(InteractiveError::Config)?,
            None => {
                tracing::warn!("no rankings file configured; every request will decline");
                RewardTable::new()
            }
        };
        let mut catalog = RankingCatalog::new(default_table);
        if let Some(dir) = &config.rankings_cache_dir {
            catalog = catalog.with_cache_dir(dir);
        }

        Ok(Self::new(Arc::new(catalog), Arc::new(executor))
            .with_funding_targets(config.funding_targets.clone())
            .with_valuation(config.valuation)
            .with_time_budget(config.default_time_budget())
            .with_retention(config.retention())
            .with_currency(currency))
    }

    /// Start a session for the wallet in `request`.
    ///
    /// The reward table is chosen by the catalog (cached, custom, then
    /// default) and the new context replaces the old one atomically;
    /// requests already running keep the context they started with.
    pub fn set_session(&self, request: SessionRequest) -> Result<Arc<SessionContext>> {
        let (wallet, mode) = request
            .into_wallet(self.funding_targets.as_map())
            .map_err(InteractiveError::Session)?;

        let unfunded: Vec<_> = wallet
            .instruments()
            .iter()
            .filter(|i| wallet.funding_target_for(i).is_none())
            .map(|i| i.id.to_string())
            .collect();
        if !unfunded.is_empty() {
            tracing::warn!(
                instruments = ?unfunded,
                "session holds instruments with no funding target; their approvals will decline"
            );
        }

        let signature = WalletSignature::compute(wallet.instruments(), mode);
        let (table, source) = self
            .catalog
            .activate(&signature)
            .map_err(InteractiveError::Session)?;

        let context = Arc::new(
            SessionContext::new(wallet, mode, table, source).with_valuation(self.valuation),
        );
        tracing::info!(
            signature = %signature,
            mode = %mode,
            source = %source,
            instruments = context.wallet().instruments().len(),
            "session started"
        );
        self.install_session(Arc::clone(&context));
        Ok(context)
    }

    /// Replace the session with a prepared context.
    pub fn install_session(&self, context: Arc<SessionContext>) {
        let mut session = self.session.write().unwrap_or_else(|e| e.into_inner());
        *session = context;
        *self.last_selection.write().unwrap_or_else(|e| e.into_inner()) = None;
    }

    /// The current session.
    pub fn session(&self) -> Arc<SessionContext> {
        Arc::clone(&self.session.read().unwrap_or_else(|e| e.into_inner()))
    }

    /// Decide one authorization request.
    ///
    /// Returns within the request's time budget. Malformed requests are
    /// rejected with an error before any side effect; everything else gets a
    /// decision, and a repeated request id gets the recorded one.
    #[tracing::instrument(
        skip(self, request),
        fields(request_id = %request.request_id, mcc = %request.mcc)
    )]
    pub async fn handle_authorization(
        &self,
        request: AuthorizationRequest,
    ) -> Result<AuthorizationDecision> {
        if let Err(err) = request.validate() {
            self.reject_malformed(&request.request_id, &err);
            return Err(err);
        }

        let request_id = request.request_id.clone();
        match self.ledger.admit(&request_id)? {
            Admission::Fresh => {
                self.metrics.record_request();
                self.audit.append(
                    &request_id,
                    AuditEventKind::Received {
                        mcc: request.mcc.clone(),
                        amount_minor_units: request.amount_minor_units,
                    },
                );
            }
            Admission::Decided(decision) => {
                tracing::debug!(approved = decision.approved, "duplicate of a decided request");
                self.metrics.record_duplicate();
                self.audit
                    .append(&request_id, AuditEventKind::DuplicateAcknowledged { in_flight: false });
                return Ok(decision.as_duplicate());
            }
            Admission::InFlight => {
                tracing::debug!("duplicate of a request still being decided");
                self.metrics.record_duplicate();
                self.audit
                    .append(&request_id, AuditEventKind::DuplicateAcknowledged { in_flight: true });
                return Ok(
                    AuthorizationDecision::decline(&request_id, DecisionReason::DuplicateInFlight)
                        .as_duplicate(),
                );
            }
        }

        let budget = request.time_budget().unwrap_or(self.default_time_budget);
        let context = self.session();
        let decision = self.decide(Arc::clone(&context), &request, budget).await;

        self.ledger.record(&decision)?;
        self.audit.append(
            &request_id,
            AuditEventKind::Decided {
                approved: decision.approved,
                reason: decision.reason.clone(),
                instrument: decision.selection.as_ref().map(|s| s.instrument.id.clone()),
            },
        );

        if let Some(selection) = &decision.selection {
            self.metrics.record_approval();
            self.remember_selection(&context, selection);
            self.dispatch_funding(&request, selection);
        }

        Ok(decision)
    }

    /// Run the selection engine under the time budget.
    async fn decide(
        &self,
        context: Arc<SessionContext>,
        request: &AuthorizationRequest,
        budget: Duration,
    ) -> AuthorizationDecision {
        let mcc = request.mcc.clone();
        let selection =
            tokio::time::timeout(budget, tokio::task::spawn_blocking(move || context.select(&mcc)))
                .await;

        match selection {
            Ok(Ok(Ok(result))) => {
                tracing::info!(
                    instrument = %result.label(),
                    effective_value = result.effective_value,
                    rule = ?result.rule,
                    "approved"
                );
                AuthorizationDecision::approve(&request.request_id, result)
            }
            Ok(Ok(Err(no_match))) => {
                self.log_no_match(&no_match);
                self.metrics.record_no_match(&no_match);
                AuthorizationDecision::decline(
                    &request.request_id,
                    DecisionReason::NoMatch { cause: no_match },
                )
            }
            Ok(Err(join_error)) => {
                tracing::error!(error = %join_error, "selection task failed");
                self.metrics.record_engine_unavailable();
                AuthorizationDecision::decline(&request.request_id, DecisionReason::EngineUnavailable)
            }
            Err(_) => {
                tracing::warn!(
                    budget_ms = budget.as_millis() as u64,
                    "selection exceeded its time budget"
                );
                self.metrics.record_deadline_decline();
                AuthorizationDecision::decline(&request.request_id, DecisionReason::DeadlineExceeded)
            }
        }
    }

    /// Keep `selection` as the session's last one, unless the session it was
    /// made in has been replaced meanwhile.
    fn remember_selection(&self, context: &Arc<SessionContext>, selection: &SelectionResult) {
        let session = self.session.read().unwrap_or_else(|e| e.into_inner());
        if !Arc::ptr_eq(&session, context) {
            tracing::debug!("session replaced while deciding; last selection unchanged");
            return;
        }
        *self.last_selection.write().unwrap_or_else(|e| e.into_inner()) = Some(selection.clone());
    }

    fn log_no_match(&self, no_match: &NoMatch) {
        match no_match {
            NoMatch::UnconfiguredFundingTarget { network } => tracing::warn!(
                network = %network,
                configuration_defect = true,
                "declined: selected network has no funding target"
            ),
            NoMatch::NoRankingData { mcc } => {
                tracing::info!(mcc = %mcc, "declined: no ranking data for category")
            }
            NoMatch::NoEligibleInstrument { mcc } => {
                tracing::info!(mcc = %mcc, "declined: no ranked instrument in wallet")
            }
        }
    }

    /// Track and spawn the funding charge for an approval.
    fn dispatch_funding(&self, request: &AuthorizationRequest, selection: &SelectionResult) {
        let request_id = request.request_id.clone();
        let amount = request.amount_minor_units;

        self.funding.track(FundingRecord::pending(
            &request_id,
            selection.funding_target.clone(),
            amount,
        ));
        self.audit.append(
            &request_id,
            AuditEventKind::FundingPending {
                funding_target: selection.funding_target.clone(),
                amount_minor_units: amount,
            },
        );

        let charge = ChargeRequest::new(amount, selection.funding_target.clone(), &request_id)
            .with_currency(&self.currency);
        let executor = Arc::clone(&self.executor);
        let audit = Arc::clone(&self.audit);
        let funding = Arc::clone(&self.funding);
        let metrics = Arc::clone(&self.metrics);
        let task_id = request_id.clone();

        let handle = tokio::spawn(async move {
            match executor.charge(&charge).await {
                Ok(receipt) => {
                    funding.update(&request_id, |r| r.mark_succeeded(receipt.charge_id.clone()));
                    audit.append(
                        &request_id,
                        AuditEventKind::FundingSucceeded {
                            charge_id: receipt.charge_id.clone(),
                        },
                    );
                    metrics.record_funding_success();
                    tracing::info!(
                        request_id = %request_id,
                        charge_id = %receipt.charge_id,
                        executor = executor.name(),
                        "funding charge confirmed"
                    );
                }
                Err(err) => {
                    let error = err.to_string();
                    funding.update(&request_id, |r| r.mark_failed(error.clone()));
                    audit.append(
                        &request_id,
                        AuditEventKind::FundingFailed {
                            error: error.clone(),
                        },
                    );
                    metrics.record_funding_failure();
                    tracing::error!(
                        critical = true,
                        request_id = %request_id,
                        funding_target = %charge.funding_target,
                        amount = charge.amount_minor_units,
                        error = %error,
                        "authorization approved but funding charge failed"
                    );
                }
            }
        });

        let mut tasks = self.tasks.lock().unwrap_or_else(|e| e.into_inner());
        tasks.retain(|_, h| !h.is_finished());
        tasks.insert(task_id, handle);
    }

    fn reject_malformed(&self, request_id: &str, err: &InteractiveError) {
        let field = match err {
            InteractiveError::MalformedRequest { field, .. } => field.clone(),
            _ => "request".to_string(),
        };
        tracing::warn!(request_id, field = %field, error = %err, "rejected malformed request");
        self.metrics.record_malformed();
        self.audit
            .append(request_id, AuditEventKind::MalformedRejected { field });
    }

    /// Validate and decide an authorization object from the issuer.
    pub async fn handle_incoming(
        &self,
        incoming: IncomingAuthorization,
    ) -> Result<AuthorizationDecision> {
        let request_id = incoming.id.clone().unwrap_or_default();
        let request = match incoming.into_request() {
            Ok(request) => request,
            Err(err) => {
                self.reject_malformed(&request_id, &err);
                return Err(err);
            }
        };
        self.handle_authorization(request).await
    }

    /// Handle an issuer event. Authorization requests are decided; other
    /// event types are acknowledged without side effects.
    pub async fn handle_event(&self, event: IssuerEvent) -> Result<EventOutcome> {
        if event.event_type != AUTHORIZATION_REQUEST_EVENT {
            tracing::debug!(event_type = %event.event_type, "acknowledged event");
            self.metrics.record_event_acknowledged();
            return Ok(EventOutcome::Acknowledged {
                event_type: event.event_type,
            });
        }

        let incoming: IncomingAuthorization = match serde_json::from_value(event.data.object) {
            Ok(incoming) => incoming,
            Err(e) => {
                let err = InteractiveError::malformed("data.object", e.to_string());
                self.reject_malformed(event.id.as_deref().unwrap_or_default(), &err);
                return Err(err);
            }
        };
        let decision = self.handle_incoming(incoming).await?;
        Ok(EventOutcome::Decided { decision })
    }

    /// Simulate a purchase at a merchant described by `descriptor`.
    pub async fn simulate(
        &self,
        descriptor: &str,
        amount_minor_units: u64,
    ) -> Result<AuthorizationDecision> {
        let mcc = merchant::classify_descriptor(descriptor);
        let request_id = format!("sim_{}", uuid::Uuid::new_v4().simple());
        tracing::info!(descriptor, mcc, request_id = %request_id, "simulating purchase");
        self.handle_authorization(AuthorizationRequest::new(request_id, mcc, amount_minor_units))
            .await
    }

    /// Wait for the funding charge of `request_id` to finish.
    pub async fn settle(&self, request_id: &str) -> Option<FundingRecord> {
        let handle = self
            .tasks
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(request_id);
        if let Some(handle) = handle {
            self.join_funding(request_id, handle).await;
        }
        self.funding.get(request_id)
    }

    /// Wait for every outstanding funding charge.
    pub async fn settle_all(&self) {
        let handles: Vec<_> = self
            .tasks
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .drain()
            .collect();
        for (request_id, handle) in handles {
            self.join_funding(&request_id, handle).await;
        }
    }

    async fn join_funding(&self, request_id: &str, handle: JoinHandle<()>) {
        if let Err(err) = handle.await {
            tracing::error!(
                critical = true,
                request_id,
                error = %err,
                "funding task aborted"
            );
            self.funding
                .update(request_id, |r| r.mark_failed(format!("funding task aborted: {}", err)));
        }
    }

    /// Drop records older than the retention window.
    pub fn prune(&self) -> Result<PruneReport> {
        let retention = i64::try_from(self.retention.as_secs()).unwrap_or(i64::MAX);
        self.prune_before(chrono::Utc::now().timestamp().saturating_sub(retention))
    }

    /// Drop decided requests, settled funding records and audit events
    /// older than `before` (Unix seconds).
    ///
    /// Requests still being decided or funded are kept with their audit
    /// trail. A pruned request id is no longer deduplicated.
    pub fn prune_before(&self, before: i64) -> Result<PruneReport> {
        let requests = self.ledger.cleanup_before(before)?;
        let funding_records = self.funding.cleanup_before(before);
        let audit_events = self.audit.cleanup_before(before, |request_id| {
            self.ledger.contains(request_id) || self.funding.get(request_id).is_some()
        });

        let report = PruneReport {
            requests,
            funding_records,
            audit_events,
        };
        tracing::info!(
            before,
            requests,
            funding_records,
            audit_events,
            "pruned protocol records"
        );
        Ok(report)
    }

    /// Funding record of an approved request.
    pub fn funding_status(&self, request_id: &str) -> Option<FundingRecord> {
        self.funding.get(request_id)
    }

    /// All funding records.
    pub fn funding(&self) -> &FundingTracker {
        &self.funding
    }

    /// Recorded decision for a request id.
    pub fn decision(&self, request_id: &str) -> Option<AuthorizationDecision> {
        self.ledger.decision(request_id)
    }

    /// Selection behind the most recent approval in this session.
    pub fn last_selection(&self) -> Option<SelectionResult> {
        self.last_selection
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Every audit event, in order.
    pub fn audit_log(&self) -> Vec<AuditEvent> {
        self.audit.snapshot()
    }

    /// Audit events for one request.
    pub fn audit_trail(&self, request_id: &str) -> Vec<AuditEvent> {
        self.audit.for_request(request_id)
    }

    /// Protocol counters.
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Ranking catalog.
    pub fn catalog(&self) -> &RankingCatalog {
        &self.catalog
    }
}
