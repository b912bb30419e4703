use anyhow::{Context, Result};
use once_cell::sync::OnceCell;
use reqwest::blocking::Client;

use crate::config::FetchConfig;

static CLIENT: OnceCell<Client> = OnceCell::new();

/// Shared blocking client. The first caller's config wins; every front-end
/// builds one `FetchConfig` per process.
pub fn http_client(cfg: &FetchConfig) -> Result<&'static Client> {
    CLIENT.get_or_try_init(|| {
        Client::builder()
            .timeout(cfg.request_timeout)
            .user_agent(cfg.user_agent.clone())
            .build()
            .context("failed to build http client")
    })
}
