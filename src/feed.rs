use chrono::{DateTime, FixedOffset};
use reqwest::Client;
use rss::Channel;

use crate::util::parse_pub_date;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FeedEntry {
    pub link: String,
    pub published: DateTime<FixedOffset>,
}

impl FeedEntry {
    /// Issue id: whatever follows the last `=` of the link
    /// (`view.php?id=1234` -> `1234`).
    pub fn issue_id(&self) -> &str {
        self.link.rsplit('=').next().unwrap_or(&self.link)
    }
}

pub async fn fetch(client: &Client, url: &str) -> reqwest::Result<String> {
    client.get(url).send().await?.error_for_status()?.text().await
}

/// Picks the most recently published item. Items without a link or a
/// readable `pubDate` are ignored.
pub fn latest_entry(xml: &str) -> anyhow::Result<Option<FeedEntry>> {
    let channel = Channel::read_from(xml.as_bytes())?;

    let latest = channel
        .items()
        .iter()
        .filter_map(|item| {
            let link = item.link()?.trim();
            let Some(published) = item.pub_date().and_then(parse_pub_date) else {
                tracing::debug!(target: "feed", "skipping {link}: no usable pubDate");
                return None;
            };
            Some(FeedEntry {
                link: link.to_owned(),
                published,
            })
        })
        .max_by_key(|entry| entry.published);

    Ok(latest)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rss(items: &[(&str, &str)]) -> String {
        let mut body = String::from(
            r#"<?xml version="1.0" encoding="UTF-8"?><rss version="2.0"><channel><title>Mantis</title><link>http://tracker.local/</link><description>issues</description>"#,
        );
        for (link, date) in items {
            body.push_str(&format!(
                "<item><title>t</title><link>{link}</link><pubDate>{date}</pubDate></item>"
            ));
        }
        body.push_str("</channel></rss>");
        body
    }

    #[test]
    fn picks_newest_regardless_of_order() {
        let xml = rss(&[
            ("http://tracker.local/view.php?id=10", "Fri, 01 Mar 2024 09:00:00 +0900"),
            ("http://tracker.local/view.php?id=12", "Fri, 01 Mar 2024 09:30:00 +0900"),
            ("http://tracker.local/view.php?id=11", "Fri, 01 Mar 2024 00:10:00 +0000"),
        ]);
        let entry = latest_entry(&xml).unwrap().unwrap();
        assert_eq!(entry.issue_id(), "12");
    }

    #[test]
    fn compares_instants_across_offsets() {
        let xml = rss(&[
            ("http://tracker.local/view.php?id=1", "Fri, 01 Mar 2024 09:30:00 +0900"),
            ("http://tracker.local/view.php?id=2", "Fri, 01 Mar 2024 01:00:00 +0000"),
        ]);
        assert_eq!(latest_entry(&xml).unwrap().unwrap().issue_id(), "2");
    }

    #[test]
    fn undated_items_ignored() {
        let xml = rss(&[
            ("http://tracker.local/view.php?id=5", "not a date"),
            ("http://tracker.local/view.php?id=6", "Fri, 01 Mar 2024 09:00:00 +0900"),
        ]);
        assert_eq!(latest_entry(&xml).unwrap().unwrap().issue_id(), "6");
    }

    #[test]
    fn empty_channel_has_no_entry() {
        assert_eq!(latest_entry(&rss(&[])).unwrap(), None);
    }

    #[test]
    fn garbage_is_an_error() {
        assert!(latest_entry("<html><body>login</body></html>").is_err());
    }

    #[test]
    fn issue_id_without_query() {
        let entry = FeedEntry {
            link: "http://tracker.local/issue".to_owned(),
            published: parse_pub_date("Fri, 01 Mar 2024 09:00:00 +0900").unwrap(),
        };
        assert_eq!(entry.issue_id(), "http://tracker.local/issue");
    }
}
