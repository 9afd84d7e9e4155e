//! Command handlers and the shared engine context.

pub mod config_cmd;
pub mod provider;
pub mod reconcile;
pub mod rules;
pub mod util;

use std::sync::Arc;

use fwsync_config::Config;
use fwsync_core::{EnforcementGateway, FirewallService, Reconciler, RuleStore};

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Engine wiring shared by every command that touches rules or the provider.
pub struct Context {
    pub gateway: Arc<EnforcementGateway>,
    pub service: FirewallService,
    pub reconciler: Arc<Reconciler>,
}

impl Context {
    pub fn build(config: &Config) -> Result<Self, CliError> {
        let store = Arc::new(RuleStore::open(config.store_path())?);
        let settings = Arc::new(config.settings_provider()?);
        let gateway = Arc::new(EnforcementGateway::new(settings));
        let service = FirewallService::new(Arc::clone(&store), Arc::clone(&gateway));
        let reconciler = Arc::new(Reconciler::new(store, Arc::clone(&gateway)));

        Ok(Self {
            gateway,
            service,
            reconciler,
        })
    }
}

pub async fn dispatch(
    cmd: Command,
    ctx: &Context,
    global: &GlobalOpts,
    config: &Config,
) -> Result<(), CliError> {
    match cmd {
        Command::Rules(args) => rules::handle(ctx, args.command, global).await,
        Command::Reconcile(args) => reconcile::handle(ctx, args.command, global, config).await,
        Command::Provider(args) => provider::handle(ctx, args.command, global).await,
        // Handled before the engine is built
        Command::Config(_) => Ok(()),
    }
}
