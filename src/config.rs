use core::time::Duration;

use chrono::FixedOffset;

use crate::util::{KST_OFFSET_HOURS, TIME_FMT, offset_hours};

/// Tracker location and login, shared by both binaries.
#[derive(clap::Args, Clone, Debug)]
pub struct Mantis {
    #[arg(long, env = "MANTIS_HOST", default_value = "http://mantis.example.com")]
    pub host: String,
    #[arg(long = "user", env = "MANTIS_ID")]
    pub username: String,
    #[arg(long, env = "MANTIS_PW", hide_env_values = true)]
    pub password: String,
    #[arg(long = "project", env = "PROJECT_ID", default_value = "1")]
    pub project_id: String,
    /// Show the Chrome window while logging in. Accepts `1`, `yes`, `on` and the like.
    #[arg(
        long,
        env = "HEADFUL",
        action = clap::ArgAction::Set,
        value_parser = clap::builder::BoolishValueParser::new(),
        num_args = 0..=1,
        default_missing_value = "true",
        default_value = "false"
    )]
    pub headful: bool,
}

impl Mantis {
    pub fn base(&self) -> &str {
        self.host.trim_end_matches('/')
    }

    pub fn login_url(&self) -> String {
        format!("{}/login_page.php", self.base())
    }

    pub fn set_project_url(&self) -> String {
        format!("{}/set_project.php?project_id={}", self.base(), self.project_id)
    }

    pub fn rss_url(&self, api_key: &str) -> String {
        format!(
            "{}/issues_rss.php?username={}&key={api_key}&project_id={}",
            self.base(),
            self.username,
            self.project_id,
        )
    }

    pub fn csv_export_url(&self) -> String {
        format!("{}/csv_export.php", self.base())
    }
}

#[derive(clap::Args, Clone, Debug)]
pub struct Monitor {
    #[arg(long, env = "MANTIS_API_KEY", hide_env_values = true)]
    pub api_key: String,
    #[arg(long, env = "SLACK_WEBHOOK_URL", hide_env_values = true)]
    pub slack_webhook_url: String,
    #[arg(long, env = "AWS_REGION", default_value = "ap-northeast-1")]
    pub aws_region: String,
    #[arg(long, env = "SOURCE_LANG", default_value = "ko")]
    pub source_lang: String,
    #[arg(long, env = "TARGET_LANG", default_value = "ja")]
    pub target_lang: String,
    #[arg(long, env = "MANTIS_TIME_FORMAT", default_value = TIME_FMT)]
    pub time_format: String,
    /// Hours east of UTC of the tracker's wall clock.
    #[arg(long, env = "MANTIS_UTC_OFFSET", default_value_t = KST_OFFSET_HOURS, allow_negative_numbers = true)]
    pub utc_offset: i32,
    #[arg(long, env = "POLL_INTERVAL_SECS", default_value_t = 60)]
    pub interval_secs: u64,
    #[arg(long, env = "CHANGE_TOLERANCE_SECS", default_value_t = 120)]
    pub tolerance_secs: i64,
    #[arg(long, env = "SENT_CACHE_CAPACITY", default_value_t = 4096)]
    pub cache_capacity: usize,
    /// Run a single poll cycle and exit.
    #[arg(long)]
    pub once: bool,
}

impl Monitor {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn timezone(&self) -> anyhow::Result<FixedOffset> {
        offset_hours(self.utc_offset)
            .ok_or_else(|| anyhow::anyhow!("utc offset {} out of range", self.utc_offset))
    }
}

#[derive(clap::Args, Clone, Debug)]
pub struct Smtp {
    #[arg(long, env = "SMTP_USER")]
    pub smtp_user: String,
    #[arg(long, env = "SMTP_PASSWORD", hide_env_values = true)]
    pub smtp_password: String,
    #[arg(long, env = "SMTP_HOST", default_value = "smtp.gmail.com")]
    pub smtp_host: String,
    #[arg(long, env = "SMTP_PORT", default_value_t = 587)]
    pub smtp_port: u16,
    /// Recipient; the SMTP user mails itself when unset.
    #[arg(long, env = "MAIL_TO")]
    pub mail_to: Option<String>,
}

impl Smtp {
    pub fn recipient(&self) -> &str {
        self.mail_to.as_deref().unwrap_or(&self.smtp_user)
    }
}
