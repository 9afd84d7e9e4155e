//! Core engine: keeps an abstract firewall rule model synchronized with the
//! provider's two enforcement mechanisms.
//!
//! The provider is the authoritative source of truth; the local
//! [`RuleStore`] is a best-effort cache of it. Mutations go provider-first
//! through the [`EnforcementGateway`], and a periodic [`Reconciler`] pass
//! re-derives the provider's actual state and corrects each rule's
//! [`SyncStatus`](model::SyncStatus).

pub mod error;
pub mod gateway;
pub mod model;
pub mod reconcile;
pub mod service;
pub mod settings;
pub mod store;
pub mod translate;

pub use error::CoreError;
pub use gateway::EnforcementGateway;
pub use model::{
    CreateRuleRequest, Direction, FirewallRule, PortRange, Protocol, RuleAction, RuleStatus,
    SyncStatus, UpdateRuleRequest,
};
pub use reconcile::{CycleSummary, ReconcileScheduler, Reconciler};
pub use service::FirewallService;
pub use settings::{ProviderSettings, SettingsProvider, StaticSettings};
pub use store::RuleStore;
