use crate::{
    issue::IssueSnapshot,
    translate::{Translator, translate_or_original},
};

/// Translated counterparts of the free-text fields of a snapshot.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Translated {
    pub title: String,
    pub author: String,
    pub body: String,
}

impl Translated {
    /// Each field is translated on its own; a failure only affects that field.
    pub async fn of<T: Translator>(translator: &T, info: &IssueSnapshot) -> Self {
        Self {
            title: translate_or_original(translator, &info.title).await,
            author: translate_or_original(translator, &info.comment.author).await,
            body: translate_or_original(translator, &info.comment.body).await,
        }
    }
}

pub fn compose(url: &str, info: &IssueSnapshot, translated: &Translated) -> String {
    format!(
        "🔗 {url}\n\
         📝 {}\n\
         📝 {}\n\
         🎯 target : {} 🧑‍💻 [{}] {}\n\
         🇯🇵\n```{}```\n\
         🇰🇷\n```{}```",
        translated.title,
        info.title,
        info.target,
        info.comment.author,
        translated.author,
        translated.body,
        info.comment.body,
    )
}
