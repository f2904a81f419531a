//! Shared fixtures for relay integration tests.

use std::io::Write;
use std::net::TcpListener;

use rstest::fixture;
use tempfile::NamedTempFile;

/// Loopback listener on an ephemeral port.
#[fixture]
pub fn tcp_listener() -> TcpListener {
    TcpListener::bind(("127.0.0.1", 0)).expect("bind ephemeral listener")
}

/// Credential file holding `reader-7:s3cr3t`.
#[fixture]
pub fn credentials_file(#[default("reader-7:s3cr3t")] record: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("create credential file");
    file.write_all(record.as_bytes())
        .expect("write credential record");
    file
}
