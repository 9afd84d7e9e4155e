//! Config inspection handlers.

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::error::CliError;
use crate::output;

pub fn handle(args: &ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Path => {
            let path = global
                .config
                .clone()
                .unwrap_or_else(fwsync_config::config_path);
            output::print_output(&path.display().to_string(), global.quiet);
            Ok(())
        }

        ConfigCommand::Show => {
            let config = match global.config {
                Some(ref path) => fwsync_config::load_from(path)?,
                None => fwsync_config::load_config()?,
            };

            // The provider table may hold a plaintext api_key; show the
            // effective config without the secret value itself.
            let mut display = config;
            if display.provider.api_key.is_some() {
                display.provider.api_key = Some("<redacted>".into());
            }

            let out = output::render_single(
                &global.output,
                &display,
                |c| toml::to_string_pretty(c).unwrap_or_default(),
                |c| c.store_path().display().to_string(),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }
    }
}
