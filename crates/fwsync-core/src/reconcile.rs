// ── Reconciliation ──
//
// Timer-driven drift detection. Each cycle re-derives the provider's
// actual rule set with one describe per configured mechanism and corrects
// every stored rule's sync status. Nothing is re-applied to the provider
// from here: the cycle only observes and classifies.
//
// A cycle never propagates an error. Mechanism query failures and
// per-rule write failures are folded into the returned summary, and the
// scheduler always advances to the next tick.

use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

use serde::Serialize;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use fwsync_api::types::{AllowListEntry, OrderedListEntry};

use crate::gateway::EnforcementGateway;
use crate::model::{FirewallRule, RuleAction, RuleStatus, SyncStatus};
use crate::store::RuleStore;
use crate::translate::ProviderSpec;

/// Outcome of one reconciliation cycle.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CycleSummary {
    /// Rules confirmed present in the provider this cycle.
    pub verified: usize,
    /// Sync-status writes performed.
    pub updated: usize,
    /// Mechanism query failures plus per-rule processing failures.
    pub errors: usize,
    pub error_messages: Vec<String>,
    pub total_rules: usize,
}

/// What one mechanism's describe produced this cycle.
enum MechanismState<T> {
    Entries(Vec<T>),
    QueryFailed(String),
    NotConfigured,
}

/// Per-rule classification result; pure data so the decision logic stays
/// testable without a provider.
struct Classification {
    verified: bool,
    transition: Option<(SyncStatus, Option<String>)>,
}

impl Classification {
    fn unchanged() -> Self {
        Self {
            verified: false,
            transition: None,
        }
    }
}

pub struct Reconciler {
    store: Arc<RuleStore>,
    gateway: Arc<EnforcementGateway>,
}

impl Reconciler {
    pub fn new(store: Arc<RuleStore>, gateway: Arc<EnforcementGateway>) -> Self {
        Self { store, gateway }
    }

    /// Run one full cycle. Infallible by design: every failure ends up in
    /// the summary instead of aborting the pass.
    pub async fn run_cycle(&self) -> CycleSummary {
        let rules = self.store.list();
        let mut summary = CycleSummary {
            total_rules: rules.len(),
            ..CycleSummary::default()
        };

        // No settings → no provider calls. Pending rules degrade to
        // not_applicable; everything else keeps its last classification.
        let Some(settings) = self.gateway.resolve_settings() else {
            for rule in &rules {
                if rule.sync_status == SyncStatus::Pending {
                    let written = self.store.update_sync_status(
                        &rule.id,
                        SyncStatus::NotApplicable,
                        Some("provider settings not configured".into()),
                    );
                    if written {
                        summary.updated += 1;
                    }
                }
            }
            debug!("reconciliation skipped: provider settings not configured");
            return summary;
        };

        let allow_state = if settings.allow_list_id.is_some() {
            match self.gateway.describe_allow_list().await {
                Ok(entries) => MechanismState::Entries(entries),
                Err(err) => {
                    let message = format!("allow-list describe failed: {err}");
                    warn!("{message}");
                    summary.errors += 1;
                    summary.error_messages.push(message);
                    MechanismState::QueryFailed(err.to_string())
                }
            }
        } else {
            MechanismState::NotConfigured
        };

        let ordered_state = if settings.ordered_list_id.is_some() {
            match self.gateway.describe_ordered_list().await {
                Ok(entries) => MechanismState::Entries(entries),
                Err(err) => {
                    let message = format!("ordered deny-list describe failed: {err}");
                    warn!("{message}");
                    summary.errors += 1;
                    summary.error_messages.push(message);
                    MechanismState::QueryFailed(err.to_string())
                }
            }
        } else {
            MechanismState::NotConfigured
        };

        for rule in &rules {
            let outcome = classify(rule, &allow_state, &ordered_state);

            if outcome.verified {
                summary.verified += 1;
            }

            if let Some((status, reason)) = outcome.transition {
                let written = self.store.update_sync_status(&rule.id, status, reason);
                if written {
                    summary.updated += 1;
                } else {
                    // Rule deleted while the cycle was running.
                    summary.errors += 1;
                    summary
                        .error_messages
                        .push(format!("rule {} vanished during the cycle", rule.id));
                }
            }
        }

        info!(
            verified = summary.verified,
            updated = summary.updated,
            errors = summary.errors,
            total = summary.total_rules,
            "reconciliation cycle complete"
        );
        summary
    }
}

/// Decide the rule's next sync status from this cycle's observations.
fn classify(
    rule: &FirewallRule,
    allow_state: &MechanismState<AllowListEntry>,
    ordered_state: &MechanismState<OrderedListEntry>,
) -> Classification {
    // Disabled rules are never enforced, whatever the provider holds.
    if rule.status == RuleStatus::Disabled {
        if rule.sync_status == SyncStatus::NotApplicable {
            return Classification::unchanged();
        }
        return Classification {
            verified: false,
            transition: Some((
                SyncStatus::NotApplicable,
                Some("rule is disabled".into()),
            )),
        };
    }

    let spec = ProviderSpec::from_rule(rule);
    let present = match (&spec, rule.action) {
        (ProviderSpec::Allow(allow), RuleAction::Allow) => match allow_state {
            MechanismState::Entries(entries) => entries.iter().any(|e| allow.matches(e)),
            MechanismState::QueryFailed(reason) => {
                return query_failure_outcome(rule, "allow-list", reason);
            }
            MechanismState::NotConfigured => {
                return not_configured_outcome(rule, "allow-list target not configured");
            }
        },
        (ProviderSpec::Deny(deny), RuleAction::Deny) => match ordered_state {
            MechanismState::Entries(entries) => entries.iter().any(|e| deny.matches(e)),
            MechanismState::QueryFailed(reason) => {
                return query_failure_outcome(rule, "ordered deny-list", reason);
            }
            MechanismState::NotConfigured => {
                return not_configured_outcome(rule, "ordered deny-list target not configured");
            }
        },
        // from_rule ties the variant to the action.
        _ => return Classification::unchanged(),
    };

    if present {
        Classification {
            verified: true,
            transition: (rule.sync_status != SyncStatus::Synced)
                .then_some((SyncStatus::Synced, None)),
        }
    } else {
        match rule.sync_status {
            SyncStatus::Synced | SyncStatus::Pending => Classification {
                verified: false,
                transition: Some((
                    SyncStatus::Failed,
                    Some("rule not found in provider".into()),
                )),
            },
            SyncStatus::Failed | SyncStatus::NotApplicable => Classification::unchanged(),
        }
    }
}

/// A describe failure only forces `pending` rules to `failed`; rules
/// already classified keep their status so a transient query error does
/// not flap them.
fn query_failure_outcome(rule: &FirewallRule, mechanism: &str, reason: &str) -> Classification {
    if rule.sync_status == SyncStatus::Pending {
        Classification {
            verified: false,
            transition: Some((
                SyncStatus::Failed,
                Some(format!("{mechanism} query failed: {reason}")),
            )),
        }
    } else {
        Classification::unchanged()
    }
}

fn not_configured_outcome(rule: &FirewallRule, reason: &str) -> Classification {
    if rule.sync_status == SyncStatus::NotApplicable {
        Classification::unchanged()
    } else {
        Classification {
            verified: false,
            transition: Some((SyncStatus::NotApplicable, Some(reason.into()))),
        }
    }
}

// ── Scheduler ────────────────────────────────────────────────────────

/// Drives [`Reconciler::run_cycle`] on a fixed interval, with one
/// shorter-delay run after start. `stop()` cancels the task and waits for
/// it; dropping the scheduler without stopping leaves no cycle running
/// past the next cancellation check.
pub struct ReconcileScheduler {
    reconciler: Arc<Reconciler>,
    interval: Duration,
    initial_delay: Duration,
    cancel: CancellationToken,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl ReconcileScheduler {
    pub fn new(reconciler: Arc<Reconciler>, interval: Duration, initial_delay: Duration) -> Self {
        Self {
            reconciler,
            interval,
            initial_delay,
            cancel: CancellationToken::new(),
            handle: Mutex::new(None),
        }
    }

    /// Spawn the background task. Idempotent: a second start while running
    /// is a no-op.
    pub fn start(&self) {
        let mut handle = self.handle.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        if handle.is_some() {
            return;
        }

        let reconciler = Arc::clone(&self.reconciler);
        let interval = self.interval;
        let initial_delay = self.initial_delay;
        let cancel = self.cancel.clone();

        *handle = Some(tokio::spawn(reconcile_task(
            reconciler,
            interval,
            initial_delay,
            cancel,
        )));
        info!(
            interval_secs = self.interval.as_secs(),
            "reconciliation scheduler started"
        );
    }

    /// Cancel the background task and wait for it to finish.
    pub async fn stop(&self) {
        self.cancel.cancel();
        let handle = self
            .handle
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }
        debug!("reconciliation scheduler stopped");
    }
}

async fn reconcile_task(
    reconciler: Arc<Reconciler>,
    interval: Duration,
    initial_delay: Duration,
    cancel: CancellationToken,
) {
    tokio::select! {
        biased;
        () = cancel.cancelled() => return,
        () = tokio::time::sleep(initial_delay) => {}
    }

    loop {
        let _ = reconciler.run_cycle().await;

        tokio::select! {
            biased;
            () = cancel.cancelled() => return,
            () = tokio::time::sleep(interval) => {}
        }
    }
}
