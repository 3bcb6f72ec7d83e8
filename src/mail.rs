use std::{
    fs, io,
    path::{Path, PathBuf},
};

use chrono::{DateTime, Local};
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{Attachment, Mailbox, MultiPart, header::ContentType},
    transport::smtp::authentication::Credentials,
};
use reqwest::{Client, header::CONTENT_TYPE};

use crate::{config::Smtp, util::TIME_FMT};

pub trait Outbox {
    async fn send(&self, message: Message) -> anyhow::Result<()>;
}

/// STARTTLS submission with login, one connection per message.
pub struct SmtpOutbox {
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpOutbox {
    pub fn new(smtp: &Smtp) -> anyhow::Result<Self> {
        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&smtp.smtp_host)?
            .port(smtp.smtp_port)
            .credentials(Credentials::new(
                smtp.smtp_user.clone(),
                smtp.smtp_password.clone(),
            ))
            .build();
        Ok(Self { transport })
    }
}

impl Outbox for SmtpOutbox {
    async fn send(&self, message: Message) -> anyhow::Result<()> {
        let response = self.transport.send(message).await?;
        tracing::debug!(target: "smtp", "server said {:?}", response.code());
        Ok(())
    }
}

/// A file that is removed when dropped, whatever happened in between.
#[derive(Debug)]
pub struct TempFile {
    path: PathBuf,
}

impl TempFile {
    pub fn create(path: PathBuf, contents: &[u8]) -> io::Result<Self> {
        fs::write(&path, contents)?;
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TempFile {
    fn drop(&mut self) {
        match fs::remove_file(&self.path) {
            Ok(()) => tracing::debug!(target: "csv", "removed {}", self.path.display()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(target: "csv", "cannot remove {}: {e}", self.path.display()),
        }
    }
}

/// Wall-clock stamp used in the subject line and, with `:` swapped for `-`,
/// in the file name.
pub fn stamp(now: DateTime<Local>) -> String {
    now.format(TIME_FMT).to_string()
}

pub fn csv_filename(project_id: &str, stamp: &str) -> String {
    format!("mantis_project_{project_id}_{}.csv", stamp.replace(':', "-"))
}

/// Downloads the export. `Ok(None)` if the tracker answered with something
/// other than CSV (usually the login page of an expired session).
pub async fn download_csv(client: &Client, url: &str) -> anyhow::Result<Option<Vec<u8>>> {
    let response = client.get(url).send().await?.error_for_status()?;
    let is_csv = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.contains("text/csv"));
    if !is_csv {
        return Ok(None);
    }
    Ok(Some(response.bytes().await?.to_vec()))
}

pub fn build_message(
    from: &str,
    to: &str,
    stamp: &str,
    filename: &str,
    csv: Vec<u8>,
) -> anyhow::Result<Message> {
    let octet_stream = ContentType::parse("application/octet-stream")
        .map_err(|e| anyhow::anyhow!("content type: {e:?}"))?;

    let message = Message::builder()
        .from(from.parse::<Mailbox>()?)
        .to(to.parse::<Mailbox>()?)
        .subject(format!("MANTIS CSV {stamp}"))
        .multipart(
            MultiPart::mixed()
                .singlepart(Attachment::new(filename.to_owned()).body(csv, octet_stream)),
        )?;
    Ok(message)
}

/// Report of one mailer run.
#[derive(Debug, PartialEq, Eq)]
pub enum Delivery {
    NotCsv,
    Sent { filename: String, bytes: usize },
    Failed { filename: String },
}

/// Download, stash in `dir`, mail, clean up.
pub async fn export_and_mail<O: Outbox>(
    client: &Client,
    csv_url: &str,
    project_id: &str,
    smtp: &Smtp,
    dir: &Path,
    outbox: &O,
    now: DateTime<Local>,
) -> anyhow::Result<Delivery> {
    let Some(csv) = download_csv(client, csv_url).await? else {
        tracing::error!(target: "csv", "\x1b[31mCSV download failed\x1b[0m: response is not CSV");
        return Ok(Delivery::NotCsv);
    };

    let stamp = stamp(now);
    let filename = csv_filename(project_id, &stamp);
    let file = TempFile::create(dir.join(&filename), &csv)?;
    tracing::info!(target: "csv", "saved \x1b[36m{}\x1b[0m ({} bytes)", file.path().display(), csv.len());

    let attachment = fs::read(file.path())?;
    let bytes = attachment.len();
    let message = build_message(&smtp.smtp_user, smtp.recipient(), &stamp, &filename, attachment)?;

    let delivery = match outbox.send(message).await {
        Ok(()) => {
            tracing::info!(target: "smtp", "\x1b[32mmail sent\x1b[0m to {}", smtp.recipient());
            Delivery::Sent { filename, bytes }
        }
        Err(e) => {
            tracing::error!(target: "smtp", "\x1b[31mmail failed\x1b[0m: {e:#}");
            Delivery::Failed { filename }
        }
    };
    drop(file);

    Ok(delivery)
}
