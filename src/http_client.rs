use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::blocking::Client;

const DEFAULT_TIMEOUT_SECS: u64 = 15;

/// Build the blocking client the provider owns. Constructed per provider
/// rather than held in a process global, so tests and reloads carry their
/// own instance.
pub fn build_client() -> Result<Client> {
    build_client_with_timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
}

fn build_client_with_timeout(timeout: Duration) -> Result<Client> {
    Client::builder()
        .timeout(timeout)
        .build()
        .context("failed to build http client")
}
