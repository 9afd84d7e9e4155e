// Hand-crafted async HTTP client for the enforcement API (v1).
//
// Base path: /v1/
// Auth: X-API-KEY header

use reqwest::header::{HeaderMap, HeaderValue};
use secrecy::ExposeSecret;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use crate::Error;
use crate::types::{AllowListEntry, EntriesResponse, OrderedListEntry};

// ── Error response shape from the enforcement API ────────────────────

#[derive(serde::Deserialize)]
struct ErrorResponse {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    code: Option<String>,
}

// ── Client ───────────────────────────────────────────────────────────

/// Async client for the enforcement API.
///
/// Uses API-key authentication and communicates via JSON REST endpoints
/// under `/v1/`.
pub struct EnforcementClient {
    http: reqwest::Client,
    base_url: Url,
}

impl EnforcementClient {
    // ── Constructors ─────────────────────────────────────────────────

    /// Build from an API key and transport config.
    ///
    /// Injects `X-API-KEY` as a default header on every request.
    pub fn from_api_key(
        base_url: &str,
        api_key: &secrecy::SecretString,
        transport: &crate::TransportConfig,
    ) -> Result<Self, Error> {
        let mut headers = HeaderMap::new();
        let mut key_value = HeaderValue::from_str(api_key.expose_secret())
            .map_err(|_| Error::InvalidApiKey)?;
        key_value.set_sensitive(true);
        headers.insert("X-API-KEY", key_value);

        let http = transport.build_client_with_headers(headers)?;
        let base_url = Self::normalize_base_url(base_url)?;

        Ok(Self { http, base_url })
    }

    /// Wrap an existing `reqwest::Client` (caller manages auth headers).
    pub fn from_reqwest(base_url: &str, http: reqwest::Client) -> Result<Self, Error> {
        let base_url = Self::normalize_base_url(base_url)?;
        Ok(Self { http, base_url })
    }

    /// Parse the base URL and guarantee a trailing slash so joins work.
    fn normalize_base_url(raw: &str) -> Result<Url, Error> {
        let mut url = Url::parse(raw)?;
        let path = url.path().trim_end_matches('/').to_owned();
        url.set_path(&format!("{path}/"));
        Ok(url)
    }

    // ── URL builder ──────────────────────────────────────────────────

    /// Join a relative path (e.g. `"v1/allow-lists/x/entries"`) onto the base.
    fn url(&self, path: &str) -> Result<Url, Error> {
        Ok(self.base_url.join(path)?)
    }

    // ── HTTP verbs ───────────────────────────────────────────────────

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, Error> {
        let url = self.url(path)?;
        debug!("GET {url}");

        let resp = self.http.get(url).send().await?;
        self.handle_response(resp).await
    }

    async fn post_empty<B: Serialize + Sync>(&self, path: &str, body: &B) -> Result<(), Error> {
        let url = self.url(path)?;
        debug!("POST {url}");

        let resp = self.http.post(url).json(body).send().await?;
        self.handle_empty(resp).await
    }

    async fn put_empty<B: Serialize + Sync>(&self, path: &str, body: &B) -> Result<(), Error> {
        let url = self.url(path)?;
        debug!("PUT {url}");

        let resp = self.http.put(url).json(body).send().await?;
        self.handle_empty(resp).await
    }

    async fn delete_with_params(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<(), Error> {
        let url = self.url(path)?;
        debug!("DELETE {url} params={params:?}");

        let resp = self.http.delete(url).query(params).send().await?;
        self.handle_empty(resp).await
    }

    // ── Response handling ────────────────────────────────────────────

    async fn handle_response<T: DeserializeOwned>(
        &self,
        resp: reqwest::Response,
    ) -> Result<T, Error> {
        let status = resp.status();
        if status.is_success() {
            let body = resp.text().await?;
            serde_json::from_str(&body).map_err(|e| {
                let preview = &body[..body.len().min(200)];
                Error::Deserialization {
                    message: format!("{e} (body preview: {preview:?})"),
                    body,
                }
            })
        } else {
            Err(self.parse_error(status, resp).await)
        }
    }

    async fn handle_empty(&self, resp: reqwest::Response) -> Result<(), Error> {
        let status = resp.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(self.parse_error(status, resp).await)
        }
    }

    async fn parse_error(&self, status: reqwest::StatusCode, resp: reqwest::Response) -> Error {
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Error::InvalidApiKey;
        }

        let raw = resp.text().await.unwrap_or_default();

        if let Ok(err) = serde_json::from_str::<ErrorResponse>(&raw) {
            Error::Api {
                status: status.as_u16(),
                message: err.message.unwrap_or_else(|| status.to_string()),
                code: err.code,
            }
        } else {
            Error::Api {
                status: status.as_u16(),
                message: if raw.is_empty() {
                    status.to_string()
                } else {
                    raw
                },
                code: None,
            }
        }
    }

    // ━━ Public API ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    // ── Allow-list ───────────────────────────────────────────────────

    /// Describe every entry of the allow-list.
    pub async fn describe_allow_list(
        &self,
        list_id: &str,
    ) -> Result<Vec<AllowListEntry>, Error> {
        let resp: EntriesResponse<AllowListEntry> = self
            .get(&format!("v1/allow-lists/{list_id}/entries"))
            .await?;
        Ok(resp.entries)
    }

    /// Authorize (add) one allow-list entry.
    ///
    /// The provider answers 409 when an identical entry already exists;
    /// callers wanting idempotent semantics check [`Error::is_conflict`].
    pub async fn authorize(&self, list_id: &str, entry: &AllowListEntry) -> Result<(), Error> {
        self.post_empty(&format!("v1/allow-lists/{list_id}/authorize"), entry)
            .await
    }

    /// Revoke (remove) one allow-list entry. 404 when already absent.
    pub async fn revoke(&self, list_id: &str, entry: &AllowListEntry) -> Result<(), Error> {
        self.post_empty(&format!("v1/allow-lists/{list_id}/revoke"), entry)
            .await
    }

    // ── Ordered deny-list ────────────────────────────────────────────

    /// Describe every numbered entry of the ordered list, both directions.
    pub async fn describe_ordered_list(
        &self,
        list_id: &str,
    ) -> Result<Vec<OrderedListEntry>, Error> {
        let resp: EntriesResponse<OrderedListEntry> = self
            .get(&format!("v1/ordered-lists/{list_id}/entries"))
            .await?;
        Ok(resp.entries)
    }

    /// Create or replace the numbered slot carried by `entry`.
    ///
    /// Replacement is keyed on `(rule_number, egress)`, so re-applying an
    /// entry under its existing number is a no-op on the provider side.
    pub async fn put_ordered_entry(
        &self,
        list_id: &str,
        entry: &OrderedListEntry,
    ) -> Result<(), Error> {
        self.put_empty(
            &format!("v1/ordered-lists/{list_id}/entries/{}", entry.rule_number),
            entry,
        )
        .await
    }

    /// Delete one numbered slot. 404 when already absent.
    pub async fn delete_ordered_entry(
        &self,
        list_id: &str,
        rule_number: u16,
        egress: bool,
    ) -> Result<(), Error> {
        self.delete_with_params(
            &format!("v1/ordered-lists/{list_id}/entries/{rule_number}"),
            &[("egress", egress.to_string())],
        )
        .await
    }
}
