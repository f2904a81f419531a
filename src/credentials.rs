//! Credential loading for endpoint authentication.
//!
//! Credentials live in a small text file holding `id:code`. The file is read
//! afresh before every send attempt so rotating the code on disk takes effect
//! without restarting the relay.

use std::{
    fmt, fs,
    io::{self, ErrorKind},
    path::{Path, PathBuf},
};

use log::warn;
use thiserror::Error;

/// File consulted when no credential path is configured.
pub const DEFAULT_CREDENTIALS_FILE: &str = "credentials.txt";
/// Separator between the identifier and the code.
pub const CREDENTIAL_DELIMITER: char = ':';

/// Errors raised while loading a credential record.
#[derive(Debug, Error)]
pub enum CredentialError {
    /// Nothing exists at the configured path.
    #[error("credential file {} doesn't exist", .path.display())]
    NotFound { path: PathBuf },
    /// The path cannot name a readable file.
    #[error("invalid credential path {}: {reason}", .path.display())]
    InvalidPath { path: PathBuf, reason: String },
    /// Any other I/O failure while reading the file.
    #[error("failed to read credential file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// The record did not split into exactly two fields.
    #[error(
        "malformed credential record in {}: expected 2 fields, found {fields}",
        .path.display()
    )]
    Malformed { path: PathBuf, fields: usize },
}

/// Identifier and code presented to the endpoint on every request.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    id: String,
    code: String,
}

impl Credentials {
    pub fn new(id: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            code: code.into(),
        }
    }

    /// Value sent in the `FM-Auth-Id` header.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Value sent in the `FM-Auth-Code` header.
    pub fn code(&self) -> &str {
        &self.code
    }

    /// Parse a raw record, rejecting anything but exactly two fields.
    fn parse(path: &Path, contents: &str) -> Result<Self, CredentialError> {
        let record = strip_line_ending(contents);
        let fields: Vec<&str> = record.split(CREDENTIAL_DELIMITER).collect();
        match fields.as_slice() {
            [id, code] => Ok(Self::new(*id, *code)),
            _ => Err(CredentialError::Malformed {
                path: path.to_path_buf(),
                fields: fields.len(),
            }),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("id", &self.id)
            .field("code", &"<redacted>")
            .finish()
    }
}

/// Read and parse the credential record stored at `path`.
///
/// Every failure is logged with the offending path before being returned.
pub fn load(path: &Path) -> Result<Credentials, CredentialError> {
    let result = read_record(path).and_then(|contents| Credentials::parse(path, &contents));
    if let Err(err) = &result {
        warn!("HttpRelay: {err}");
    }
    result
}

fn read_record(path: &Path) -> Result<String, CredentialError> {
    if path.as_os_str().is_empty() {
        return Err(CredentialError::InvalidPath {
            path: path.to_path_buf(),
            reason: "path is empty".into(),
        });
    }
    fs::read_to_string(path).map_err(|err| match err.kind() {
        ErrorKind::NotFound => CredentialError::NotFound {
            path: path.to_path_buf(),
        },
        ErrorKind::InvalidInput | ErrorKind::IsADirectory | ErrorKind::NotADirectory => {
            CredentialError::InvalidPath {
                path: path.to_path_buf(),
                reason: err.to_string(),
            }
        }
        _ => CredentialError::Read {
            path: path.to_path_buf(),
            source: err,
        },
    })
}

fn strip_line_ending(contents: &str) -> &str {
    contents
        .strip_suffix("\r\n")
        .or_else(|| contents.strip_suffix('\n'))
        .unwrap_or(contents)
}
