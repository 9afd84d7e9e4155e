//! Provider-state handlers: read-only dump and manual slot repair.

use serde::Serialize;
use tabled::Tabled;

use fwsync_api::types::{AllowListEntry, OrderedListEntry};

use crate::cli::{GlobalOpts, ProviderCommand};
use crate::error::CliError;
use crate::output;

use super::Context;
use super::util;

/// Snapshot of both mechanisms; `None` marks an unconfigured target.
#[derive(Serialize)]
struct ProviderState {
    allow_list: Option<Vec<AllowListEntry>>,
    ordered_list: Option<Vec<OrderedListEntry>>,
}

#[derive(Tabled)]
struct AllowRow {
    #[tabled(rename = "Dir")]
    direction: String,
    #[tabled(rename = "Proto")]
    protocol: String,
    #[tabled(rename = "Ports")]
    ports: String,
    #[tabled(rename = "Ranges")]
    ranges: String,
}

impl From<&AllowListEntry> for AllowRow {
    fn from(e: &AllowListEntry) -> Self {
        let ports = match (e.from_port, e.to_port) {
            (Some(from), Some(to)) => format!("{from}-{to}"),
            _ => "-".into(),
        };
        let ranges = e
            .ip_ranges
            .iter()
            .chain(e.ipv6_ranges.iter())
            .cloned()
            .collect::<Vec<_>>()
            .join(", ");
        Self {
            direction: format!("{:?}", e.direction).to_lowercase(),
            protocol: e.protocol.clone(),
            ports,
            ranges,
        }
    }
}

#[derive(Tabled)]
struct OrderedRow {
    #[tabled(rename = "#")]
    rule_number: u16,
    #[tabled(rename = "Dir")]
    direction: String,
    #[tabled(rename = "Proto")]
    protocol: String,
    #[tabled(rename = "Verdict")]
    verdict: String,
    #[tabled(rename = "CIDR")]
    cidr: String,
    #[tabled(rename = "Ports")]
    ports: String,
}

impl From<&OrderedListEntry> for OrderedRow {
    fn from(e: &OrderedListEntry) -> Self {
        Self {
            rule_number: e.rule_number,
            direction: if e.egress { "egress" } else { "ingress" }.into(),
            protocol: e.protocol.clone(),
            verdict: e.rule_action.clone(),
            cidr: e
                .cidr_block
                .clone()
                .or_else(|| e.ipv6_cidr_block.clone())
                .unwrap_or_else(|| "-".into()),
            ports: e
                .port_range
                .map_or_else(|| "-".into(), |p| format!("{}-{}", p.from, p.to)),
        }
    }
}

fn state_detail(state: &ProviderState) -> String {
    let mut sections = Vec::new();

    match &state.allow_list {
        Some(entries) if entries.is_empty() => {
            sections.push("Allow-list: (empty)".to_owned());
        }
        Some(entries) => {
            let rows: Vec<AllowRow> = entries.iter().map(AllowRow::from).collect();
            sections.push(format!(
                "Allow-list:\n{}",
                tabled::Table::new(rows).with(tabled::settings::Style::rounded())
            ));
        }
        None => sections.push("Allow-list: (not configured)".to_owned()),
    }

    match &state.ordered_list {
        Some(entries) if entries.is_empty() => {
            sections.push("Ordered deny-list: (empty)".to_owned());
        }
        Some(entries) => {
            let rows: Vec<OrderedRow> = entries.iter().map(OrderedRow::from).collect();
            sections.push(format!(
                "Ordered deny-list:\n{}",
                tabled::Table::new(rows).with(tabled::settings::Style::rounded())
            ));
        }
        None => sections.push("Ordered deny-list: (not configured)".to_owned()),
    }

    sections.join("\n\n")
}

pub async fn handle(
    ctx: &Context,
    cmd: ProviderCommand,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match cmd {
        ProviderCommand::Dump => {
            let settings =
                ctx.gateway
                    .resolve_settings()
                    .ok_or_else(|| CliError::Configuration {
                        message: "provider settings not configured".into(),
                    })?;

            let allow_list = if settings.allow_list_id.is_some() {
                Some(ctx.gateway.describe_allow_list().await?)
            } else {
                None
            };
            let ordered_list = if settings.ordered_list_id.is_some() {
                Some(ctx.gateway.describe_ordered_list().await?)
            } else {
                None
            };

            let state = ProviderState {
                allow_list,
                ordered_list,
            };
            let out = output::render_single(&global.output, &state, state_detail, |s| {
                format!(
                    "{} allow / {} ordered",
                    s.allow_list.as_ref().map_or(0, Vec::len),
                    s.ordered_list.as_ref().map_or(0, Vec::len)
                )
            });
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ProviderCommand::DeleteEntry {
            rule_number,
            egress,
        } => {
            let direction = if egress { "egress" } else { "ingress" };
            if !util::confirm(
                &format!("Delete {direction} ordered-list entry #{rule_number}?"),
                global.yes,
            )? {
                return Ok(());
            }

            ctx.gateway.delete_ordered_entry(rule_number, egress).await?;
            if !global.quiet {
                eprintln!("Ordered-list entry #{rule_number} ({direction}) deleted");
            }
            Ok(())
        }
    }
}
