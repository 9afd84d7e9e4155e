// ── Enforcement gateway ──
//
// Translates an abstract rule into provider operations and applies or
// removes it against the configured allow-list / ordered deny-list.
// Degradations that keep apply/revoke idempotent ("already exists" on
// authorize, "not found" on removal) are absorbed here; every other
// provider failure propagates unmodified. No retries at this layer.

use std::sync::Arc;

use tracing::debug;

use fwsync_api::types::{AllowListEntry, OrderedListEntry};
use fwsync_api::{EnforcementClient, TransportConfig};

use crate::error::CoreError;
use crate::model::FirewallRule;
use crate::settings::{ProviderSettings, SettingsProvider};
use crate::translate::ProviderSpec;

pub struct EnforcementGateway {
    settings: Arc<dyn SettingsProvider>,
    transport: TransportConfig,
}

impl EnforcementGateway {
    pub fn new(settings: Arc<dyn SettingsProvider>) -> Self {
        Self {
            settings,
            transport: TransportConfig::default(),
        }
    }

    pub fn with_transport(settings: Arc<dyn SettingsProvider>, transport: TransportConfig) -> Self {
        Self {
            settings,
            transport,
        }
    }

    // ── Settings resolution ──────────────────────────────────────

    /// Current provider settings, or `None` when unconfigured.
    pub fn resolve_settings(&self) -> Option<ProviderSettings> {
        self.settings.settings()
    }

    fn require_settings(&self) -> Result<ProviderSettings, CoreError> {
        self.resolve_settings().ok_or_else(|| CoreError::Configuration {
            message: "provider settings not configured".into(),
        })
    }

    fn client(&self, settings: &ProviderSettings) -> Result<EnforcementClient, CoreError> {
        Ok(EnforcementClient::from_api_key(
            &settings.endpoint_url(),
            &settings.api_key,
            &self.transport,
        )?)
    }

    fn require_allow_list(settings: &ProviderSettings) -> Result<&str, CoreError> {
        settings
            .allow_list_id
            .as_deref()
            .ok_or_else(|| CoreError::Configuration {
                message: "allow-list target not configured".into(),
            })
    }

    fn require_ordered_list(settings: &ProviderSettings) -> Result<&str, CoreError> {
        settings
            .ordered_list_id
            .as_deref()
            .ok_or_else(|| CoreError::Configuration {
                message: "ordered deny-list target not configured".into(),
            })
    }

    // ── Apply / revoke ───────────────────────────────────────────

    /// Put the rule's effect in place on the provider.
    ///
    /// Allow rules authorize against the allow-list; "already exists" is
    /// success. Deny rules create-or-replace their deterministic numbered
    /// slot on the ordered list, so re-applying the same rule reuses the
    /// slot.
    pub async fn apply(&self, rule: &FirewallRule) -> Result<(), CoreError> {
        let settings = self.require_settings()?;
        let client = self.client(&settings)?;

        match ProviderSpec::from_rule(rule) {
            ProviderSpec::Allow(spec) => {
                let list_id = Self::require_allow_list(&settings)?;
                match client.authorize(list_id, &spec.to_entry()).await {
                    Ok(()) => Ok(()),
                    Err(err) if err.is_conflict() => {
                        debug!(rule = %rule.id, "allow-list entry already present");
                        Ok(())
                    }
                    Err(err) => Err(err.into()),
                }
            }
            ProviderSpec::Deny(spec) => {
                let list_id = Self::require_ordered_list(&settings)?;
                client.put_ordered_entry(list_id, &spec.to_entry()).await?;
                Ok(())
            }
        }
    }

    /// Remove the rule's effect from the provider. "Not found" is success:
    /// the entry is already absent.
    pub async fn revoke(&self, rule: &FirewallRule) -> Result<(), CoreError> {
        let settings = self.require_settings()?;
        let client = self.client(&settings)?;

        let result = match ProviderSpec::from_rule(rule) {
            ProviderSpec::Allow(spec) => {
                let list_id = Self::require_allow_list(&settings)?;
                client.revoke(list_id, &spec.to_entry()).await
            }
            ProviderSpec::Deny(spec) => {
                let list_id = Self::require_ordered_list(&settings)?;
                client
                    .delete_ordered_entry(list_id, spec.rule_number(), spec.egress())
                    .await
            }
        };

        match result {
            Ok(()) => Ok(()),
            Err(err) if err.is_not_found() => {
                debug!(rule = %rule.id, "provider entry already absent");
                Ok(())
            }
            Err(err) => Err(err.into()),
        }
    }

    // ── Describe (reconciliation reads) ──────────────────────────

    /// Batch describe of the allow-list; one call covers all allow rules.
    pub async fn describe_allow_list(&self) -> Result<Vec<AllowListEntry>, CoreError> {
        let settings = self.require_settings()?;
        let list_id = Self::require_allow_list(&settings)?;
        let client = self.client(&settings)?;
        Ok(client.describe_allow_list(list_id).await?)
    }

    /// Batch describe of the ordered deny-list, both directions.
    pub async fn describe_ordered_list(&self) -> Result<Vec<OrderedListEntry>, CoreError> {
        let settings = self.require_settings()?;
        let list_id = Self::require_ordered_list(&settings)?;
        let client = self.client(&settings)?;
        Ok(client.describe_ordered_list(list_id).await?)
    }

    // ── Operator drift repair ────────────────────────────────────

    /// Delete one numbered slot directly. "Not found" is success.
    pub async fn delete_ordered_entry(
        &self,
        rule_number: u16,
        egress: bool,
    ) -> Result<(), CoreError> {
        let settings = self.require_settings()?;
        let list_id = Self::require_ordered_list(&settings)?;
        let client = self.client(&settings)?;

        match client
            .delete_ordered_entry(list_id, rule_number, egress)
            .await
        {
            Ok(()) => Ok(()),
            Err(err) if err.is_not_found() => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}
