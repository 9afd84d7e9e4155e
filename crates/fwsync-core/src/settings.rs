// ── Provider settings ──
//
// The engine does not own credential/target configuration; it consumes it
// through the SettingsProvider seam. A `None` answer is the signal that the
// provider is unconfigured, which degrades rules to `not_applicable`
// instead of failing them.

use secrecy::SecretString;
use url::Url;

/// Target resources and credentials for the enforcement surface.
#[derive(Debug, Clone)]
pub struct ProviderSettings {
    /// Perimeter allow-list target. Absent → allow rules are not applicable.
    pub allow_list_id: Option<String>,

    /// Ordered deny-list target. Absent → deny rules are not applicable.
    pub ordered_list_id: Option<String>,

    pub region: String,

    pub api_key: SecretString,

    /// Explicit endpoint override; when absent the regional default is used.
    pub endpoint: Option<Url>,
}

impl ProviderSettings {
    /// The endpoint the enforcement client talks to.
    pub fn endpoint_url(&self) -> String {
        self.endpoint.as_ref().map_or_else(
            || format!("https://firewall.{}.cloudapi.net", self.region),
            ToString::to_string,
        )
    }
}

/// Source of [`ProviderSettings`].
pub trait SettingsProvider: Send + Sync {
    /// Current settings, or `None` when the provider is unconfigured.
    fn settings(&self) -> Option<ProviderSettings>;
}

/// Fixed settings, mainly for tests and embedding.
pub struct StaticSettings(Option<ProviderSettings>);

impl StaticSettings {
    pub fn new(settings: ProviderSettings) -> Self {
        Self(Some(settings))
    }

    pub fn unconfigured() -> Self {
        Self(None)
    }
}

impl SettingsProvider for StaticSettings {
    fn settings(&self) -> Option<ProviderSettings> {
        self.0.clone()
    }
}
