use chrono::TimeDelta;
use mrelay::{
    auth::BrowserLogin,
    config::{Mantis, Monitor},
    notify::SlackWebhook,
    poller::{Poller, Rules},
    scrape::Pacing,
    translate::AwsTranslate,
};

#[derive(clap::Parser)]
#[command(about = "Relays new Mantis bugnotes to Slack, translated")]
struct Args {
    #[command(flatten)]
    mantis: Mantis,
    #[command(flatten)]
    monitor: Monitor,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    use clap::Parser;

    mrelay::util::init_logger();

    let Args { mantis, monitor } = Args::parse();

    let gateway = mrelay::scrape::basic()?;
    let rules = Rules {
        time_format: monitor.time_format.clone(),
        timezone: monitor.timezone()?,
        tolerance: TimeDelta::try_seconds(monitor.tolerance_secs)
            .ok_or_else(|| anyhow::anyhow!("tolerance {}s out of range", monitor.tolerance_secs))?,
        cache_capacity: monitor.cache_capacity,
    };
    let translator = AwsTranslate::new(
        monitor.aws_region.clone(),
        monitor.source_lang.clone(),
        monitor.target_lang.clone(),
    )
    .await;
    let notifier = SlackWebhook::new(gateway.clone(), monitor.slack_webhook_url.clone());

    let mut poller = Poller::new(
        gateway,
        mantis.rss_url(&monitor.api_key),
        BrowserLogin::new(mantis.clone(), Pacing::MONITOR),
        translator,
        notifier,
        rules,
    )?;

    tracing::info!(
        target: "main",
        "watching project \x1b[1;36m{}\x1b[0m on {} every {}s",
        mantis.project_id,
        mantis.base(),
        monitor.interval_secs,
    );

    if monitor.once {
        let outcome = poller.poll().await;
        tracing::info!(target: "main", "outcome: {outcome:?}");
        return Ok(());
    }

    match poller.run(monitor.interval()).await {}
}
