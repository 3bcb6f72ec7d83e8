use mrelay::{
    auth::{Authenticator, BrowserLogin},
    config::{Mantis, Smtp},
    mail::{Delivery, SmtpOutbox, export_and_mail},
    scrape::Pacing,
};

#[derive(clap::Parser)]
#[command(about = "Mails the Mantis CSV export of one project")]
struct Args {
    #[command(flatten)]
    mantis: Mantis,
    #[command(flatten)]
    smtp: Smtp,
    /// Where the export is stashed before sending.
    #[arg(long, env = "CSV_DIR")]
    dir: Option<std::path::PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    use clap::Parser;

    mrelay::util::init_logger();

    let Args { mantis, smtp, dir } = Args::parse();
    let dir = dir.unwrap_or_else(std::env::temp_dir);

    let client = BrowserLogin::new(mantis.clone(), Pacing::MAILER)
        .authenticate()
        .await?;
    let outbox = SmtpOutbox::new(&smtp)?;

    let delivery = export_and_mail(
        &client,
        &mantis.csv_export_url(),
        &mantis.project_id,
        &smtp,
        &dir,
        &outbox,
        chrono::Local::now(),
    )
    .await?;

    match &delivery {
        Delivery::Sent { filename, bytes } => {
            tracing::info!(target: "main", "\x1b[32m{filename}\x1b[0m ({bytes} bytes) delivered");
        }
        Delivery::NotCsv | Delivery::Failed { .. } => {
            tracing::warn!(target: "main", "nothing delivered: {delivery:?}");
        }
    }

    Ok(())
}
