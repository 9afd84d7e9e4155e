//! Shared helpers for command handlers.

use fwsync_core::PortRange;

use crate::error::CliError;

/// Confirm a destructive operation, honoring `--yes`.
pub fn confirm(message: &str, yes_flag: bool) -> Result<bool, CliError> {
    if yes_flag {
        return Ok(true);
    }
    let confirmed = dialoguer::Confirm::new()
        .with_prompt(message)
        .default(false)
        .interact()
        .map_err(|e| CliError::Io(std::io::Error::other(e)))?;
    Ok(confirmed)
}

/// Parse a `--ports` value: a single port (`"22"`) or a range (`"8000-8080"`).
pub fn parse_port_range(raw: &str) -> Result<PortRange, CliError> {
    let invalid = |reason: &str| CliError::Validation {
        field: "ports".into(),
        reason: reason.into(),
    };

    let (from, to) = match raw.split_once('-') {
        Some((from, to)) => (from.trim(), to.trim()),
        None => (raw.trim(), raw.trim()),
    };

    let from: u16 = from
        .parse()
        .map_err(|_| invalid(&format!("'{from}' is not a port number")))?;
    let to: u16 = to
        .parse()
        .map_err(|_| invalid(&format!("'{to}' is not a port number")))?;

    if from == 0 || to == 0 {
        return Err(invalid("port 0 is not addressable"));
    }
    if from > to {
        return Err(invalid("range start exceeds range end"));
    }

    Ok(PortRange { from, to })
}
