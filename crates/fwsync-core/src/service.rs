// ── Firewall service ──
//
// Orchestrates rule mutations with provider-first write ordering: for
// create and update the gateway call must succeed before the store is
// touched, which keeps the provider authoritative and the store a cache.
// Delete is the one asymmetric path -- the store row is dropped first so a
// failed provider revoke can never resurrect it (the cost is a possible
// orphaned provider entry, repaired manually via delete_ordered_entry).

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::CoreError;
use crate::gateway::EnforcementGateway;
use crate::model::{
    CreateRuleRequest, FirewallRule, RuleStatus, SyncStatus, UpdateRuleRequest,
};
use crate::store::RuleStore;

pub struct FirewallService {
    store: Arc<RuleStore>,
    gateway: Arc<EnforcementGateway>,
}

impl FirewallService {
    pub fn new(store: Arc<RuleStore>, gateway: Arc<EnforcementGateway>) -> Self {
        Self { store, gateway }
    }

    // ── Reads ────────────────────────────────────────────────────

    pub fn list_rules(&self) -> Vec<Arc<FirewallRule>> {
        self.store.list()
    }

    pub fn get_rule(&self, id: &Uuid) -> Result<Arc<FirewallRule>, CoreError> {
        self.store.get(id).ok_or(CoreError::NotFound { id: *id })
    }

    // ── Create ───────────────────────────────────────────────────

    /// Apply to the provider, then persist. A provider failure aborts the
    /// operation and leaves the store without a record.
    pub async fn create_rule(
        &self,
        input: CreateRuleRequest,
    ) -> Result<Arc<FirewallRule>, CoreError> {
        let now = Utc::now();
        let mut rule = FirewallRule {
            id: Uuid::new_v4(),
            name: input.name,
            action: input.action,
            direction: input.direction,
            protocol: input.protocol,
            port_range: input.port_range,
            source: input.source,
            destination: input.destination,
            status: input.status,
            sync_status: SyncStatus::Pending,
            sync_error: None,
            created_at: now,
            updated_at: now,
        };

        match rule.status {
            RuleStatus::Enabled => {
                self.gateway.apply(&rule).await?;
                rule.sync_status = SyncStatus::Synced;
            }
            RuleStatus::Disabled => {
                rule.sync_status = SyncStatus::NotApplicable;
                rule.sync_error = Some("rule is disabled".into());
            }
        }

        let stored = self.store.create(rule);
        info!(rule = %stored.id, name = %stored.name, "firewall rule created");
        Ok(stored)
    }

    // ── Update ───────────────────────────────────────────────────

    /// Best-effort revoke of the old representation, apply the merged one,
    /// then persist. A failed revoke is logged, not fatal -- the old entry
    /// may already have drifted away. A failed apply aborts with the
    /// stored record untouched.
    pub async fn update_rule(
        &self,
        id: &Uuid,
        input: UpdateRuleRequest,
    ) -> Result<Arc<FirewallRule>, CoreError> {
        let existing = self.get_rule(id)?;

        if existing.status == RuleStatus::Enabled {
            if let Err(err) = self.gateway.revoke(&existing).await {
                warn!(rule = %id, error = %err, "revoke of previous representation failed");
            }
        }

        let mut merged = (*existing).clone();
        if let Some(name) = input.name {
            merged.name = name;
        }
        if let Some(action) = input.action {
            merged.action = action;
        }
        if let Some(direction) = input.direction {
            merged.direction = direction;
        }
        if let Some(protocol) = input.protocol {
            merged.protocol = protocol;
        }
        if let Some(port_range) = input.port_range {
            merged.port_range = Some(port_range);
        }
        if let Some(source) = input.source {
            merged.source = Some(source);
        }
        if let Some(destination) = input.destination {
            merged.destination = Some(destination);
        }
        if let Some(status) = input.status {
            merged.status = status;
        }
        merged.updated_at = Utc::now();

        match merged.status {
            RuleStatus::Enabled => {
                self.gateway.apply(&merged).await?;
                merged.sync_status = SyncStatus::Synced;
                merged.sync_error = None;
            }
            RuleStatus::Disabled => {
                merged.sync_status = SyncStatus::NotApplicable;
                merged.sync_error = Some("rule is disabled".into());
            }
        }

        let updated = self
            .store
            .update(id, move |rule| *rule = merged)
            .ok_or(CoreError::NotFound { id: *id })?;

        info!(rule = %id, "firewall rule updated");
        Ok(updated)
    }

    // ── Delete ───────────────────────────────────────────────────

    /// Remove the store record, then revoke the previous representation.
    /// Never touches the gateway when the id is unknown.
    pub async fn delete_rule(&self, id: &Uuid) -> Result<(), CoreError> {
        let existing = self.get_rule(id)?;

        if !self.store.delete(id) {
            return Err(CoreError::NotFound { id: *id });
        }

        if existing.status == RuleStatus::Enabled {
            self.gateway.revoke(&existing).await?;
        }

        info!(rule = %id, "firewall rule deleted");
        Ok(())
    }
}
