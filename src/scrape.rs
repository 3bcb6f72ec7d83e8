use core::time::Duration;

use reqwest::{
    Client,
    header::{COOKIE, HeaderMap, HeaderValue},
};

mod puppeteer;

pub use puppeteer::{Pacing, first_tab, login_cookies, puppeteer};

pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Plain client for unauthenticated endpoints (RSS, webhook).
pub fn basic() -> reqwest::Result<Client> {
    Client::builder().timeout(REQUEST_TIMEOUT).build()
}

/// Client that replays browser cookies on every request.
pub fn with_cookie(cookie: &str) -> anyhow::Result<Client> {
    let mut headers = HeaderMap::new();
    if !cookie.is_empty() {
        headers.insert(COOKIE, HeaderValue::try_from(cookie)?);
    }
    Ok(Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .default_headers(headers)
        .build()?)
}

/// Folds `(name, value)` pairs into one `Cookie` header value.
pub fn cookie_header<'a, I>(cookies: I) -> String
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut header = String::new();
    for (name, value) in cookies {
        if !header.is_empty() {
            header.push_str("; ");
        }
        header.push_str(name);
        header.push('=');
        header.push_str(value);
    }
    header
}
