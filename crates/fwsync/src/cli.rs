//! Clap derive structures for the `fwsync` CLI.
//!
//! Defines the complete command tree, global flags, and shared value enums.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use uuid::Uuid;

// ── Top-Level CLI ────────────────────────────────────────────────────

/// fwsync -- keep firewall rules in sync with the provider's enforcement
#[derive(Debug, Parser)]
#[command(
    name = "fwsync",
    version,
    about = "Manage firewall rules and reconcile them against the provider",
    long_about = "Synchronizes an abstract firewall rule model with the provider's\n\
        perimeter allow-list and ordered deny-list. The provider is the\n\
        source of truth; a periodic reconciliation pass detects drift and\n\
        corrects each rule's sync status.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Config file path (defaults to the platform config dir)
    #[arg(long, short = 'c', env = "FWSYNC_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "FWSYNC_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Skip confirmation prompts
    #[arg(long, short = 'y', global = true)]
    pub yes: bool,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

// ── Shared value enums ───────────────────────────────────────────────

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum RuleActionArg {
    /// Enforced through the perimeter allow-list
    Allow,
    /// Enforced through the ordered deny-list
    Deny,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum DirectionArg {
    Ingress,
    Egress,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ProtocolArg {
    Tcp,
    Udp,
    Icmp,
    All,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Manage firewall rules
    #[command(alias = "rule", alias = "r")]
    Rules(RulesArgs),

    /// Run or watch the reconciliation loop
    #[command(alias = "rec")]
    Reconcile(ReconcileArgs),

    /// Inspect and repair provider-side state
    Provider(ProviderArgs),

    /// Show configuration
    Config(ConfigArgs),
}

// ── Rules ────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct RulesArgs {
    #[command(subcommand)]
    pub command: RulesCommand,
}

#[derive(Debug, Subcommand)]
pub enum RulesCommand {
    /// List all rules with their sync status
    #[command(alias = "ls")]
    List,

    /// Show one rule
    Get { id: Uuid },

    /// Create a rule (applied to the provider first)
    Create {
        /// Rule name
        #[arg(long)]
        name: String,

        /// Enforcement mechanism
        #[arg(long)]
        action: RuleActionArg,

        /// Traffic direction
        #[arg(long, default_value = "ingress")]
        direction: DirectionArg,

        /// Protocol
        #[arg(long, default_value = "tcp")]
        protocol: ProtocolArg,

        /// Port or port range, e.g. "22" or "8000-8080" (tcp/udp only)
        #[arg(long)]
        ports: Option<String>,

        /// Source address (IP or CIDR); omit for "any"
        #[arg(long)]
        source: Option<String>,

        /// Destination address (IP or CIDR); omit for "any"
        #[arg(long)]
        destination: Option<String>,

        /// Create the rule disabled (not enforced)
        #[arg(long)]
        disabled: bool,
    },

    /// Update a rule (old provider entry revoked best-effort, new applied)
    Update {
        id: Uuid,

        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        action: Option<RuleActionArg>,

        #[arg(long)]
        direction: Option<DirectionArg>,

        #[arg(long)]
        protocol: Option<ProtocolArg>,

        /// Port or port range, e.g. "22" or "8000-8080"
        #[arg(long)]
        ports: Option<String>,

        #[arg(long)]
        source: Option<String>,

        #[arg(long)]
        destination: Option<String>,

        /// Enable the rule
        #[arg(long, conflicts_with = "disable")]
        enable: bool,

        /// Disable the rule
        #[arg(long)]
        disable: bool,
    },

    /// Delete a rule (store record first, then provider revoke)
    #[command(alias = "rm")]
    Delete { id: Uuid },
}

// ── Reconcile ────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ReconcileArgs {
    #[command(subcommand)]
    pub command: ReconcileCommand,
}

#[derive(Debug, Subcommand)]
pub enum ReconcileCommand {
    /// Run one reconciliation cycle now and print the summary
    Run,

    /// Run the periodic reconciliation loop until interrupted
    Watch,
}

// ── Provider ─────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ProviderArgs {
    #[command(subcommand)]
    pub command: ProviderCommand,
}

#[derive(Debug, Subcommand)]
pub enum ProviderCommand {
    /// Dump the provider's current enforcement state (read-only)
    Dump,

    /// Delete one numbered ordered-list slot (drift repair)
    DeleteEntry {
        /// Slot number in [1, 32766]
        rule_number: u16,

        /// Target the egress direction instead of ingress
        #[arg(long)]
        egress: bool,
    },
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print the config file path
    Path,

    /// Print the effective configuration
    Show,
}
