// ── Provider translation and membership matching ──
//
// Each enforcement mechanism has its own representation of a rule, built
// here as a tagged sum so the normalization rules stay next to the variant
// they apply to. `apply`, `revoke`, and the reconciliation membership test
// all go through the same construction -- diverging normalizations between
// the write path and the read path would report false drift.

use uuid::Uuid;

use fwsync_api::types::{AllowListEntry, EntryDirection, OrderedListEntry, PortRangeSpec};

use crate::model::{Direction, FirewallRule, PortRange, Protocol, RuleAction};

/// "Any" candidates substituted for a missing address expression.
pub const ANY_IPV4: &str = "0.0.0.0/0";
pub const ANY_IPV6: &str = "::/0";

/// Wildcard protocol code, shared by both mechanisms.
pub const PROTOCOL_WILDCARD: &str = "-1";

/// Highest assignable ordered-list slot.
pub const RULE_NUMBER_MAX: u16 = 32766;

// ── Protocol code tables ─────────────────────────────────────────────

/// Symbolic protocol → allow-list code.
fn allow_protocol_code(protocol: Protocol) -> &'static str {
    match protocol {
        Protocol::Tcp => "tcp",
        Protocol::Udp => "udp",
        Protocol::Icmp => "icmp",
        Protocol::All => PROTOCOL_WILDCARD,
    }
}

/// Symbolic protocol → ordered-list numeric code.
fn ordered_protocol_code(protocol: Protocol) -> &'static str {
    match protocol {
        Protocol::Tcp => "6",
        Protocol::Udp => "17",
        Protocol::Icmp => "1",
        Protocol::All => PROTOCOL_WILDCARD,
    }
}

// ── Rule-number allocation ───────────────────────────────────────────

/// Deterministic ordered-list slot for a rule id.
///
/// FNV-1a over the raw id bytes, folded into `[1, RULE_NUMBER_MAX]`.
/// Stable across apply calls, so an update replaces the slot it created.
/// Collisions are possible at large rule counts; the last writer owns the
/// slot.
pub fn rule_number_for(id: &Uuid) -> u16 {
    const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

    let mut hash = FNV_OFFSET;
    for byte in id.as_bytes() {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(FNV_PRIME);
    }

    #[allow(clippy::cast_possible_truncation)]
    let slot = (hash % u64::from(RULE_NUMBER_MAX)) as u16;
    slot + 1
}

// ── Address normalization ────────────────────────────────────────────

/// Normalized address candidates, split by family.
#[derive(Debug, Clone, PartialEq, Eq)]
struct AddressCandidates {
    v4: Vec<String>,
    v6: Vec<String>,
}

/// Normalize a rule's active address into per-family candidates.
///
/// Absent → both "any" forms. For the ordered list (`widen`), a bare IP is
/// widened to `/32` (v4) or `/128` (v6); the allow-list takes the address
/// verbatim.
fn candidates(address: Option<&str>, widen: bool) -> AddressCandidates {
    let Some(addr) = address else {
        return AddressCandidates {
            v4: vec![ANY_IPV4.to_owned()],
            v6: vec![ANY_IPV6.to_owned()],
        };
    };

    let is_v6 = addr.contains(':');
    let normalized = if widen && !addr.contains('/') {
        if is_v6 {
            format!("{addr}/128")
        } else {
            format!("{addr}/32")
        }
    } else {
        addr.to_owned()
    };

    if is_v6 {
        AddressCandidates {
            v4: Vec::new(),
            v6: vec![normalized],
        }
    } else {
        AddressCandidates {
            v4: vec![normalized],
            v6: Vec::new(),
        }
    }
}

// ── Allow-list representation ────────────────────────────────────────

/// A rule as the allow-list mechanism sees it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllowSpec {
    direction: EntryDirection,
    protocol: &'static str,
    from_port: Option<u16>,
    to_port: Option<u16>,
    ip_ranges: Vec<String>,
    ipv6_ranges: Vec<String>,
}

impl AllowSpec {
    fn from_rule(rule: &FirewallRule) -> Self {
        let ports = port_bounds(rule.protocol, rule.port_range);
        let addrs = candidates(rule.active_address(), false);

        Self {
            direction: match rule.direction {
                Direction::Ingress => EntryDirection::Ingress,
                Direction::Egress => EntryDirection::Egress,
            },
            protocol: allow_protocol_code(rule.protocol),
            from_port: ports.map(|p| p.from),
            to_port: ports.map(|p| p.to),
            ip_ranges: addrs.v4,
            ipv6_ranges: addrs.v6,
        }
    }

    /// The wire entry sent on authorize/revoke.
    pub fn to_entry(&self) -> AllowListEntry {
        AllowListEntry {
            protocol: self.protocol.to_owned(),
            from_port: self.from_port,
            to_port: self.to_port,
            ip_ranges: self.ip_ranges.clone(),
            ipv6_ranges: self.ipv6_ranges.clone(),
            direction: self.direction,
        }
    }

    /// Set-membership test against one described entry.
    pub fn matches(&self, entry: &AllowListEntry) -> bool {
        if entry.direction != self.direction {
            return false;
        }

        if entry.protocol != self.protocol && entry.protocol != PROTOCOL_WILDCARD {
            return false;
        }

        // Ports only discriminate for concrete port-carrying protocols.
        if self.protocol != PROTOCOL_WILDCARD
            && self.protocol != "icmp"
            && (entry.from_port != self.from_port || entry.to_port != self.to_port)
        {
            return false;
        }

        self.ip_ranges.iter().any(|r| entry.ip_ranges.contains(r))
            || self
                .ipv6_ranges
                .iter()
                .any(|r| entry.ipv6_ranges.contains(r))
    }
}

/// Port bounds sent to the provider: tcp/udp carry the configured range,
/// icmp/all carry none.
fn port_bounds(protocol: Protocol, range: Option<PortRange>) -> Option<PortRange> {
    match protocol {
        Protocol::Tcp | Protocol::Udp => range,
        Protocol::Icmp | Protocol::All => None,
    }
}

// ── Ordered deny-list representation ─────────────────────────────────

/// A rule as the ordered deny-list mechanism sees it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DenySpec {
    rule_number: u16,
    protocol: &'static str,
    rule_action: RuleAction,
    egress: bool,
    v4_cidrs: Vec<String>,
    v6_cidrs: Vec<String>,
    port_range: Option<PortRange>,
}

impl DenySpec {
    fn from_rule(rule: &FirewallRule) -> Self {
        let addrs = candidates(rule.active_address(), true);

        Self {
            rule_number: rule_number_for(&rule.id),
            protocol: ordered_protocol_code(rule.protocol),
            rule_action: rule.action,
            egress: rule.direction == Direction::Egress,
            v4_cidrs: addrs.v4,
            v6_cidrs: addrs.v6,
            port_range: port_bounds(rule.protocol, rule.port_range),
        }
    }

    pub fn rule_number(&self) -> u16 {
        self.rule_number
    }

    pub fn egress(&self) -> bool {
        self.egress
    }

    /// The wire entry sent on create-or-replace. A rule with no address
    /// lands as the IPv4 "any" entry.
    pub fn to_entry(&self) -> OrderedListEntry {
        let (cidr_block, ipv6_cidr_block) = match self.v4_cidrs.first() {
            Some(v4) => (Some(v4.clone()), None),
            None => (None, self.v6_cidrs.first().cloned()),
        };

        OrderedListEntry {
            rule_number: self.rule_number,
            protocol: self.protocol.to_owned(),
            rule_action: self.rule_action.to_string(),
            egress: self.egress,
            cidr_block,
            ipv6_cidr_block,
            port_range: self.port_range.map(|p| PortRangeSpec {
                from: p.from,
                to: p.to,
            }),
        }
    }

    /// Membership test against one described entry. Slot numbers do not
    /// participate: a renumbered entry with identical content still counts
    /// as present.
    pub fn matches(&self, entry: &OrderedListEntry) -> bool {
        if entry.egress != self.egress {
            return false;
        }

        if entry.rule_action != self.rule_action.to_string() {
            return false;
        }

        if entry.protocol != self.protocol && entry.protocol != PROTOCOL_WILDCARD {
            return false;
        }

        let v4_hit = entry
            .cidr_block
            .as_ref()
            .is_some_and(|c| self.v4_cidrs.contains(c));
        let v6_hit = entry
            .ipv6_cidr_block
            .as_ref()
            .is_some_and(|c| self.v6_cidrs.contains(c));

        v4_hit || v6_hit
    }
}

// ── Tagged sum over the two mechanisms ───────────────────────────────

/// The provider-side representation of a rule, tagged by mechanism.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderSpec {
    Allow(AllowSpec),
    Deny(DenySpec),
}

impl ProviderSpec {
    pub fn from_rule(rule: &FirewallRule) -> Self {
        match rule.action {
            RuleAction::Allow => Self::Allow(AllowSpec::from_rule(rule)),
            RuleAction::Deny => Self::Deny(DenySpec::from_rule(rule)),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use pretty_assertions::assert_eq;

    use crate::model::{RuleStatus, SyncStatus};

    use super::*;

    fn rule(action: RuleAction, direction: Direction) -> FirewallRule {
        FirewallRule {
            id: Uuid::new_v4(),
            name: "test".into(),
            action,
            direction,
            protocol: Protocol::Tcp,
            port_range: Some(PortRange { from: 22, to: 22 }),
            source: None,
            destination: None,
            status: RuleStatus::Enabled,
            sync_status: SyncStatus::Pending,
            sync_error: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    // ── Rule numbers ─────────────────────────────────────────────

    #[test]
    fn rule_number_is_stable_per_id() {
        let id = Uuid::new_v4();
        assert_eq!(rule_number_for(&id), rule_number_for(&id));
    }

    #[test]
    fn rule_number_stays_in_assignable_range() {
        for _ in 0..1000 {
            let n = rule_number_for(&Uuid::new_v4());
            assert!((1..=RULE_NUMBER_MAX).contains(&n));
        }
    }

    #[test]
    fn deny_specs_for_same_rule_share_the_slot() {
        let mut r = rule(RuleAction::Deny, Direction::Ingress);
        let ProviderSpec::Deny(first) = ProviderSpec::from_rule(&r) else {
            panic!("expected deny spec");
        };

        // Content changes must not move the slot.
        r.port_range = Some(PortRange { from: 25, to: 25 });
        let ProviderSpec::Deny(second) = ProviderSpec::from_rule(&r) else {
            panic!("expected deny spec");
        };

        assert_eq!(first.rule_number(), second.rule_number());
    }

    // ── Allow-list translation ───────────────────────────────────

    #[test]
    fn missing_address_becomes_both_any_forms() {
        let r = rule(RuleAction::Allow, Direction::Ingress);
        let entry = match ProviderSpec::from_rule(&r) {
            ProviderSpec::Allow(spec) => spec.to_entry(),
            ProviderSpec::Deny(_) => panic!("expected allow spec"),
        };

        assert_eq!(entry.protocol, "tcp");
        assert_eq!(entry.from_port, Some(22));
        assert_eq!(entry.to_port, Some(22));
        assert_eq!(entry.ip_ranges, vec![ANY_IPV4.to_owned()]);
        assert_eq!(entry.ipv6_ranges, vec![ANY_IPV6.to_owned()]);
    }

    #[test]
    fn allow_list_address_is_not_widened() {
        let mut r = rule(RuleAction::Allow, Direction::Ingress);
        r.source = Some("203.0.113.7".into());

        let entry = match ProviderSpec::from_rule(&r) {
            ProviderSpec::Allow(spec) => spec.to_entry(),
            ProviderSpec::Deny(_) => panic!("expected allow spec"),
        };

        assert_eq!(entry.ip_ranges, vec!["203.0.113.7".to_owned()]);
    }

    #[test]
    fn allow_match_accepts_protocol_wildcard_entry() {
        let r = rule(RuleAction::Allow, Direction::Ingress);
        let ProviderSpec::Allow(spec) = ProviderSpec::from_rule(&r) else {
            panic!("expected allow spec");
        };

        let entry = AllowListEntry {
            protocol: PROTOCOL_WILDCARD.into(),
            from_port: None,
            to_port: None,
            ip_ranges: vec![ANY_IPV4.into()],
            ipv6_ranges: vec![],
            direction: EntryDirection::Ingress,
        };

        assert!(spec.matches(&entry));
    }

    #[test]
    fn allow_match_requires_exact_ports_for_tcp() {
        let r = rule(RuleAction::Allow, Direction::Ingress);
        let ProviderSpec::Allow(spec) = ProviderSpec::from_rule(&r) else {
            panic!("expected allow spec");
        };

        let entry = AllowListEntry {
            protocol: "tcp".into(),
            from_port: Some(2222),
            to_port: Some(2222),
            ip_ranges: vec![ANY_IPV4.into()],
            ipv6_ranges: vec![],
            direction: EntryDirection::Ingress,
        };

        assert!(!spec.matches(&entry));
    }

    #[test]
    fn allow_match_requires_same_direction() {
        let r = rule(RuleAction::Allow, Direction::Ingress);
        let ProviderSpec::Allow(spec) = ProviderSpec::from_rule(&r) else {
            panic!("expected allow spec");
        };

        let entry = AllowListEntry {
            protocol: "tcp".into(),
            from_port: Some(22),
            to_port: Some(22),
            ip_ranges: vec![ANY_IPV4.into()],
            ipv6_ranges: vec![],
            direction: EntryDirection::Egress,
        };

        assert!(!spec.matches(&entry));
    }

    // ── Ordered-list translation ─────────────────────────────────

    #[test]
    fn bare_ip_is_widened_for_the_ordered_list() {
        let mut r = rule(RuleAction::Deny, Direction::Ingress);
        r.source = Some("10.0.0.5".into());

        let ProviderSpec::Deny(spec) = ProviderSpec::from_rule(&r) else {
            panic!("expected deny spec");
        };

        let entry = OrderedListEntry {
            rule_number: 7,
            protocol: "6".into(),
            rule_action: "deny".into(),
            egress: false,
            cidr_block: Some("10.0.0.5/32".into()),
            ipv6_cidr_block: None,
            port_range: None,
        };

        assert!(spec.matches(&entry));
        assert_eq!(spec.to_entry().cidr_block.as_deref(), Some("10.0.0.5/32"));
    }

    #[test]
    fn bare_ipv6_widens_to_128() {
        let mut r = rule(RuleAction::Deny, Direction::Ingress);
        r.source = Some("2001:db8::1".into());

        let ProviderSpec::Deny(spec) = ProviderSpec::from_rule(&r) else {
            panic!("expected deny spec");
        };

        let entry = spec.to_entry();
        assert_eq!(entry.cidr_block, None);
        assert_eq!(entry.ipv6_cidr_block.as_deref(), Some("2001:db8::1/128"));
    }

    #[test]
    fn missing_address_matches_any_entry() {
        let r = rule(RuleAction::Deny, Direction::Ingress);
        let ProviderSpec::Deny(spec) = ProviderSpec::from_rule(&r) else {
            panic!("expected deny spec");
        };

        let v4_any = OrderedListEntry {
            rule_number: 1,
            protocol: "6".into(),
            rule_action: "deny".into(),
            egress: false,
            cidr_block: Some(ANY_IPV4.into()),
            ipv6_cidr_block: None,
            port_range: None,
        };
        let v6_any = OrderedListEntry {
            cidr_block: None,
            ipv6_cidr_block: Some(ANY_IPV6.into()),
            ..v4_any.clone()
        };

        assert!(spec.matches(&v4_any));
        assert!(spec.matches(&v6_any));
    }

    #[test]
    fn deny_match_requires_matching_egress_flag() {
        let r = rule(RuleAction::Deny, Direction::Egress);
        let ProviderSpec::Deny(spec) = ProviderSpec::from_rule(&r) else {
            panic!("expected deny spec");
        };
        assert!(spec.egress());

        let ingress_entry = OrderedListEntry {
            rule_number: 1,
            protocol: "6".into(),
            rule_action: "deny".into(),
            egress: false,
            cidr_block: Some(ANY_IPV4.into()),
            ipv6_cidr_block: None,
            port_range: None,
        };

        assert!(!spec.matches(&ingress_entry));
    }

    #[test]
    fn deny_match_requires_deny_verdict() {
        let r = rule(RuleAction::Deny, Direction::Ingress);
        let ProviderSpec::Deny(spec) = ProviderSpec::from_rule(&r) else {
            panic!("expected deny spec");
        };

        let allow_entry = OrderedListEntry {
            rule_number: 1,
            protocol: "6".into(),
            rule_action: "allow".into(),
            egress: false,
            cidr_block: Some(ANY_IPV4.into()),
            ipv6_cidr_block: None,
            port_range: None,
        };

        assert!(!spec.matches(&allow_entry));
    }
}
