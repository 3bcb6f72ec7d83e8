use aws_config::{BehaviorVersion, Region};
use aws_sdk_translate::Client;

pub trait Translator {
    async fn translate(&self, text: &str) -> anyhow::Result<String>;
}

/// Translates `text`, or hands it back untouched if the service fails.
pub async fn translate_or_original<T: Translator>(translator: &T, text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }
    match translator.translate(text).await {
        Ok(translated) => translated,
        Err(e) => {
            tracing::warn!(target: "translate", "\x1b[33mtranslation failed\x1b[0m for {text:?}: {e:#}");
            text.to_owned()
        }
    }
}

/// Amazon Translate with a fixed language pair.
pub struct AwsTranslate {
    client: Client,
    source: String,
    target: String,
}

impl AwsTranslate {
    pub async fn new(region: String, source: String, target: String) -> Self {
        let config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(region))
            .load()
            .await;
        Self {
            client: Client::new(&config),
            source,
            target,
        }
    }
}

impl Translator for AwsTranslate {
    async fn translate(&self, text: &str) -> anyhow::Result<String> {
        let output = self
            .client
            .translate_text()
            .text(text)
            .source_language_code(&self.source)
            .target_language_code(&self.target)
            .send()
            .await?;
        Ok(output.translated_text().to_owned())
    }
}
