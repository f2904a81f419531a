//! INI configuration for relays.
//!
//! Startup code can describe a relay in an INI file instead of wiring the
//! builder by hand:
//!
//! ```ini
//! [relay]
//! url = https://collector.example.com/api/reads
//! skip_certificate_validation = false
//! credentials_path = /etc/uidrelay/credentials.txt
//! connect_timeout_ms = 5000
//! request_timeout_ms = 30000
//! ```
//!
//! Only `url` is required. Parsing uses the `rust-ini` crate.

use std::{
    fs,
    io::{self, ErrorKind},
    path::Path,
};

use ini::{Ini, Properties};

use crate::builder::{RelayBuildError, RelayBuilder};

/// Section holding relay settings.
pub const RELAY_SECTION: &str = "relay";

impl RelayBuilder {
    /// Load builder settings from the `[relay]` section of an INI file.
    pub fn from_ini_file(path: impl AsRef<Path>) -> Result<Self, RelayBuildError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|err| match err.kind() {
            ErrorKind::NotFound => io::Error::new(
                ErrorKind::NotFound,
                format!("{} doesn't exist", path.display()),
            ),
            _ => err,
        })?;
        Self::from_ini_str(&text)
    }

    /// Load builder settings from INI text.
    pub fn from_ini_str(text: &str) -> Result<Self, RelayBuildError> {
        let ini = Ini::load_from_str(text)
            .map_err(|err| RelayBuildError::InvalidConfig(format!("malformed INI: {err}")))?;
        let section = ini.section(Some(RELAY_SECTION)).ok_or_else(|| {
            RelayBuildError::InvalidConfig(format!("missing [{RELAY_SECTION}] section"))
        })?;
        apply_section(Self::new(), section)
    }
}

fn apply_section(
    mut builder: RelayBuilder,
    section: &Properties,
) -> Result<RelayBuilder, RelayBuildError> {
    if let Some(url) = section.get("url") {
        builder = builder.with_url(url);
    }
    if let Some(value) = section.get("skip_certificate_validation") {
        builder = builder.with_skip_certificate_validation(parse_bool(
            "skip_certificate_validation",
            value,
        )?);
    }
    if let Some(path) = section.get("credentials_path") {
        builder = builder.with_credentials_path(path);
    }
    if let Some(value) = section.get("connect_timeout_ms") {
        builder = builder.with_connect_timeout_ms(parse_millis("connect_timeout_ms", value)?);
    }
    if let Some(value) = section.get("request_timeout_ms") {
        builder = builder.with_request_timeout_ms(parse_millis("request_timeout_ms", value)?);
    }
    Ok(builder)
}

fn parse_bool(key: &str, value: &str) -> Result<bool, RelayBuildError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "1" | "on" => Ok(true),
        "false" | "no" | "0" | "off" => Ok(false),
        other => Err(RelayBuildError::InvalidConfig(format!(
            "{key} must be a boolean, got {other:?}"
        ))),
    }
}

fn parse_millis(key: &str, value: &str) -> Result<u64, RelayBuildError> {
    value.trim().parse().map_err(|_| {
        RelayBuildError::InvalidConfig(format!(
            "{key} must be a whole number of milliseconds, got {value:?}"
        ))
    })
}
