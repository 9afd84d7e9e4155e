//! Rule CRUD handlers.

use std::sync::Arc;

use tabled::Tabled;

use fwsync_core::{
    CreateRuleRequest, Direction, FirewallRule, Protocol, RuleAction, RuleStatus,
    UpdateRuleRequest,
};

use crate::cli::{DirectionArg, GlobalOpts, ProtocolArg, RuleActionArg, RulesCommand};
use crate::error::CliError;
use crate::output;

use super::util;
use super::Context;

fn map_action(a: RuleActionArg) -> RuleAction {
    match a {
        RuleActionArg::Allow => RuleAction::Allow,
        RuleActionArg::Deny => RuleAction::Deny,
    }
}

fn map_direction(d: DirectionArg) -> Direction {
    match d {
        DirectionArg::Ingress => Direction::Ingress,
        DirectionArg::Egress => Direction::Egress,
    }
}

fn map_protocol(p: ProtocolArg) -> Protocol {
    match p {
        ProtocolArg::Tcp => Protocol::Tcp,
        ProtocolArg::Udp => Protocol::Udp,
        ProtocolArg::Icmp => Protocol::Icmp,
        ProtocolArg::All => Protocol::All,
    }
}

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct RuleRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Action")]
    action: String,
    #[tabled(rename = "Dir")]
    direction: String,
    #[tabled(rename = "Proto")]
    protocol: String,
    #[tabled(rename = "Ports")]
    ports: String,
    #[tabled(rename = "Address")]
    address: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Sync")]
    sync: String,
}

impl From<&Arc<FirewallRule>> for RuleRow {
    fn from(r: &Arc<FirewallRule>) -> Self {
        Self {
            id: r.id.to_string(),
            name: r.name.clone(),
            action: r.action.to_string(),
            direction: r.direction.to_string(),
            protocol: r.protocol.to_string(),
            ports: r
                .port_range
                .map_or_else(|| "-".into(), |p| format!("{}-{}", p.from, p.to)),
            address: r.active_address().unwrap_or("any").to_owned(),
            status: r.status.to_string(),
            sync: r.sync_status.to_string(),
        }
    }
}

fn rule_detail(r: &Arc<FirewallRule>) -> String {
    [
        format!("ID:          {}", r.id),
        format!("Name:        {}", r.name),
        format!("Action:      {}", r.action),
        format!("Direction:   {}", r.direction),
        format!("Protocol:    {}", r.protocol),
        format!(
            "Ports:       {}",
            r.port_range
                .map_or_else(|| "-".into(), |p| format!("{}-{}", p.from, p.to))
        ),
        format!("Source:      {}", r.source.as_deref().unwrap_or("any")),
        format!("Destination: {}", r.destination.as_deref().unwrap_or("any")),
        format!("Status:      {}", r.status),
        format!("Sync:        {}", r.sync_status),
        format!("Sync error:  {}", r.sync_error.as_deref().unwrap_or("-")),
        format!("Created:     {}", r.created_at.to_rfc3339()),
        format!("Updated:     {}", r.updated_at.to_rfc3339()),
    ]
    .join("\n")
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    ctx: &Context,
    cmd: RulesCommand,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match cmd {
        RulesCommand::List => {
            let rules = ctx.service.list_rules();
            let out = output::render_list(
                &global.output,
                &rules,
                |r| RuleRow::from(r),
                |r| r.id.to_string(),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }

        RulesCommand::Get { id } => {
            let rule = ctx.service.get_rule(&id)?;
            let out = output::render_single(&global.output, &rule, rule_detail, |r| {
                r.id.to_string()
            });
            output::print_output(&out, global.quiet);
            Ok(())
        }

        RulesCommand::Create {
            name,
            action,
            direction,
            protocol,
            ports,
            source,
            destination,
            disabled,
        } => {
            let port_range = ports.as_deref().map(util::parse_port_range).transpose()?;

            let rule = ctx
                .service
                .create_rule(CreateRuleRequest {
                    name,
                    action: map_action(action),
                    direction: map_direction(direction),
                    protocol: map_protocol(protocol),
                    port_range,
                    source,
                    destination,
                    status: if disabled {
                        RuleStatus::Disabled
                    } else {
                        RuleStatus::Enabled
                    },
                })
                .await?;

            let out = output::render_single(&global.output, &rule, rule_detail, |r| {
                r.id.to_string()
            });
            output::print_output(&out, global.quiet);
            Ok(())
        }

        RulesCommand::Update {
            id,
            name,
            action,
            direction,
            protocol,
            ports,
            source,
            destination,
            enable,
            disable,
        } => {
            let port_range = ports.as_deref().map(util::parse_port_range).transpose()?;
            let status = if enable {
                Some(RuleStatus::Enabled)
            } else if disable {
                Some(RuleStatus::Disabled)
            } else {
                None
            };

            let rule = ctx
                .service
                .update_rule(
                    &id,
                    UpdateRuleRequest {
                        name,
                        action: action.map(map_action),
                        direction: direction.map(map_direction),
                        protocol: protocol.map(map_protocol),
                        port_range,
                        source,
                        destination,
                        status,
                    },
                )
                .await?;

            let out = output::render_single(&global.output, &rule, rule_detail, |r| {
                r.id.to_string()
            });
            output::print_output(&out, global.quiet);
            Ok(())
        }

        RulesCommand::Delete { id } => {
            if !util::confirm(&format!("Delete firewall rule {id}?"), global.yes)? {
                return Ok(());
            }
            ctx.service.delete_rule(&id).await?;
            if !global.quiet {
                eprintln!("Firewall rule deleted");
            }
            Ok(())
        }
    }
}
