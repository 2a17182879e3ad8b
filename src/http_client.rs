use std::time::Duration;

use anyhow::{Context, Result};
use once_cell::sync::OnceCell;
use reqwest::blocking::Client;

// Page loads through the driver can take a while; sheets calls are quick.
const REQUEST_TIMEOUT_SECS: u64 = 60;

static CLIENT: OnceCell<Client> = OnceCell::new();

pub fn http_client() -> Result<&'static Client> {
    CLIENT.get_or_try_init(|| {
        Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .user_agent(concat!("matchsheet/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("failed to build http client")
    })
}
