use std::{ffi::OsStr, sync::Arc, thread::sleep, time::Duration};

use headless_chrome::{Browser, LaunchOptions, Tab};

use crate::config::Mantis;

/// Pauses after each login step; the tracker redirects between forms.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Pacing {
    pub after_username: Duration,
    pub after_password: Duration,
    pub after_project: Duration,
}

impl Pacing {
    pub const MONITOR: Self = Self {
        after_username: Duration::from_secs(1),
        after_password: Duration::from_secs(3),
        after_project: Duration::from_secs(1),
    };

    pub const MAILER: Self = Self {
        after_username: Duration::from_secs(2),
        after_password: Duration::from_secs(5),
        after_project: Duration::from_secs(2),
    };
}

pub fn puppeteer(headless: bool) -> anyhow::Result<Browser> {
    Browser::new(LaunchOptions {
        args: vec![
            OsStr::new("--no-sandbox"),
            OsStr::new("--disable-dev-shm-usage"),
        ],
        headless,
        sandbox: false,
        ..LaunchOptions::default()
    })
}

#[allow(clippy::significant_drop_tightening)]
pub fn first_tab(browser: &Browser) -> anyhow::Result<Arc<Tab>> {
    let tab = browser.new_tab()?;

    {
        let tabs_guard = browser
            .get_tabs()
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);

        for remain in &*tabs_guard {
            if !Arc::ptr_eq(&tab, remain) {
                remain.close(true)?;
            }
        }
    }

    Ok(tab)
}

/// Drives the two-step login form and project selection, then hands back the
/// session cookies as `(name, value)` pairs. Blocking; the browser process is
/// gone when this returns.
pub fn login_cookies(mantis: &Mantis, pacing: Pacing) -> anyhow::Result<Vec<(String, String)>> {
    const SUBMIT: &str = "input[type='submit']";

    let browser = puppeteer(!mantis.headful)?;
    let tab = first_tab(&browser)?;

    tracing::info!(target: "login", "opening \x1b[36m{}\x1b[0m ...", mantis.login_url());
    tab.navigate_to(&mantis.login_url())?.wait_until_navigated()?;

    tab.wait_for_element("#username")?.type_into(&mantis.username)?;
    tab.find_element(SUBMIT)?.click()?;
    sleep(pacing.after_username);

    tab.wait_for_element("#password")?.type_into(&mantis.password)?;
    tab.find_element(SUBMIT)?.click()?;
    sleep(pacing.after_password);

    tab.navigate_to(&mantis.set_project_url())?;
    sleep(pacing.after_project);

    let cookies = tab
        .get_cookies()?
        .into_iter()
        .map(|c| (c.name, c.value))
        .collect::<Vec<_>>();
    tracing::info!(target: "login", "collected {} cookies", cookies.len());

    Ok(cookies)
}
