use reqwest::Client;
use tokio::task::spawn_blocking;

use crate::{
    config::Mantis,
    scrape::{Pacing, cookie_header, login_cookies, with_cookie},
};

/// Produces an HTTP client that the tracker treats as logged in.
pub trait Authenticator {
    async fn authenticate(&self) -> anyhow::Result<Client>;
}

/// Logs in through headless Chrome and replays its cookies.
pub struct BrowserLogin {
    mantis: Mantis,
    pacing: Pacing,
}

impl BrowserLogin {
    pub const fn new(mantis: Mantis, pacing: Pacing) -> Self {
        Self { mantis, pacing }
    }
}

impl Authenticator for BrowserLogin {
    async fn authenticate(&self) -> anyhow::Result<Client> {
        let mantis = self.mantis.clone();
        let pacing = self.pacing;
        let cookies = spawn_blocking(move || login_cookies(&mantis, pacing)).await??;

        let header = cookie_header(cookies.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        with_cookie(&header)
    }
}

/// At most one authenticated client per process, created on first use and
/// never refreshed.
pub struct Session<A> {
    provider: A,
    client: Option<Client>,
}

impl<A: Authenticator> Session<A> {
    pub const fn new(provider: A) -> Self {
        Self {
            provider,
            client: None,
        }
    }

    pub const fn is_authenticated(&self) -> bool {
        self.client.is_some()
    }

    pub async fn get(&mut self) -> anyhow::Result<&Client> {
        Ok(if let Some(ref client) = self.client {
            client
        } else {
            tracing::info!(target: "session", "no session yet, logging in ...");
            let client = self.provider.authenticate().await?;
            self.client.insert(client)
        })
    }
}
