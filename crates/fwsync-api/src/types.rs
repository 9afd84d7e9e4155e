//! Wire types for the enforcement API.

use serde::{Deserialize, Serialize};

/// Traffic direction marker used by the allow-list mechanism.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryDirection {
    Ingress,
    Egress,
}

/// One entry of a perimeter allow-list.
///
/// Entries have set-membership semantics: the provider reports the full set
/// on describe, and authorize/revoke add or remove one member. A protocol of
/// `"-1"` is the wildcard and matches any protocol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AllowListEntry {
    pub protocol: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub from_port: Option<u16>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub to_port: Option<u16>,

    #[serde(default)]
    pub ip_ranges: Vec<String>,

    #[serde(default)]
    pub ipv6_ranges: Vec<String>,

    pub direction: EntryDirection,
}

/// Port range attached to an ordered-list entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortRangeSpec {
    pub from: u16,
    pub to: u16,
}

/// One numbered entry of an ordered deny-list.
///
/// The provider evaluates entries in ascending `rule_number` order and
/// applies the first match; numbers are unique per direction within
/// `[1, 32766]`. Exactly one of `cidr_block` / `ipv6_cidr_block` is set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderedListEntry {
    pub rule_number: u16,

    pub protocol: String,

    /// `"allow"` or `"deny"` -- the ordered mechanism supports both verdicts.
    pub rule_action: String,

    pub egress: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub cidr_block: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub ipv6_cidr_block: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub port_range: Option<PortRangeSpec>,
}

/// Envelope returned by both describe endpoints.
#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct EntriesResponse<T> {
    #[serde(default)]
    pub entries: Vec<T>,
}
