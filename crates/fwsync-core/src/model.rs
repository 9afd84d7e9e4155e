// ── Firewall rule domain types ──

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

/// Which enforcement mechanism carries the rule.
///
/// `Allow` rules live exclusively on the perimeter allow-list, `Deny` rules
/// exclusively on the ordered deny-list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum RuleAction {
    Allow,
    Deny,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Direction {
    Ingress,
    Egress,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Protocol {
    Tcp,
    Udp,
    Icmp,
    All,
}

/// Whether the rule should be enforced at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum RuleStatus {
    Enabled,
    Disabled,
}

/// Last-known agreement state with the provider.
///
/// Store-owned: transitions come only from the service (on mutation) and
/// the reconciliation pass (on drift detection), never from API clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SyncStatus {
    Pending,
    Synced,
    Failed,
    NotApplicable,
}

/// Inclusive port range, meaningful only for tcp/udp rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortRange {
    pub from: u16,
    pub to: u16,
}

/// An abstract access-control rule, as persisted by the [`RuleStore`](crate::RuleStore).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FirewallRule {
    pub id: Uuid,
    pub name: String,
    pub action: RuleAction,
    pub direction: Direction,
    pub protocol: Protocol,
    pub port_range: Option<PortRange>,

    /// Address expression (single IP or CIDR). `source` is active for
    /// ingress rules, `destination` for egress; absent means "any".
    pub source: Option<String>,
    pub destination: Option<String>,

    pub status: RuleStatus,
    pub sync_status: SyncStatus,

    /// Human-readable reason, present only when `sync_status` is
    /// `failed` or `not_applicable`.
    pub sync_error: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl FirewallRule {
    /// The address expression active for this rule's direction.
    pub fn active_address(&self) -> Option<&str> {
        match self.direction {
            Direction::Ingress => self.source.as_deref(),
            Direction::Egress => self.destination.as_deref(),
        }
    }
}

// ── Mutation requests ────────────────────────────────────────────────

/// Input for rule creation. `sync_status` is store-owned and absent here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateRuleRequest {
    pub name: String,
    pub action: RuleAction,
    pub direction: Direction,
    pub protocol: Protocol,

    #[serde(default)]
    pub port_range: Option<PortRange>,

    #[serde(default)]
    pub source: Option<String>,

    #[serde(default)]
    pub destination: Option<String>,

    #[serde(default = "default_status")]
    pub status: RuleStatus,
}

fn default_status() -> RuleStatus {
    RuleStatus::Enabled
}

/// Partial update; `None` fields are left unchanged.
///
/// Clearing an optional field (port range, address) back to "any" is done
/// by delete + recreate, not through update.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateRuleRequest {
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub action: Option<RuleAction>,

    #[serde(default)]
    pub direction: Option<Direction>,

    #[serde(default)]
    pub protocol: Option<Protocol>,

    #[serde(default)]
    pub port_range: Option<PortRange>,

    #[serde(default)]
    pub source: Option<String>,

    #[serde(default)]
    pub destination: Option<String>,

    #[serde(default)]
    pub status: Option<RuleStatus>,
}
