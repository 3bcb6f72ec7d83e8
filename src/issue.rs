use scraper::{ElementRef, Html, Selector};

pub const UNKNOWN_TARGET: &str = "UNKNOWN";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Comment {
    pub author: String,
    /// Date and time tokens of the bugnote label, e.g. `2024-03-01 09:05`.
    pub time: String,
    pub body: String,
}

/// What one poll needs from `view.php`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IssueSnapshot {
    pub title: String,
    pub last_modified: String,
    pub target: String,
    pub comment: Comment,
}

pub struct Selectors {
    pub sel_title: Selector,
    pub sel_last_modified: Selector,
    pub sel_target: Selector,
    pub sel_bugnote: Selector,
    pub sel_author: Selector,
    pub sel_time: Selector,
    pub sel_note: Selector,
}

fn compile(css: &str) -> anyhow::Result<Selector> {
    Selector::parse(css).map_err(|e| anyhow::anyhow!("selector {css:?}: {e}"))
}

fn text_of(element: ElementRef) -> String {
    element.text().collect::<String>().trim().to_owned()
}

impl Selectors {
    pub fn new() -> anyhow::Result<Self> {
        Ok(Self {
            sel_title: compile("title")?,
            sel_last_modified: compile("td.bug-last-modified")?,
            sel_target: compile("th.bug-target-version.category")?,
            sel_bugnote: compile("tr.bugnote")?,
            sel_author: compile("a[title]")?,
            sel_time: compile("p.small.lighter")?,
            sel_note: compile("td.bugnote-note")?,
        })
    }

    /// `Ok(None)` when the issue has no bugnotes yet.
    pub fn parse(&self, html: &str) -> anyhow::Result<Option<IssueSnapshot>> {
        let document = Html::parse_document(html);

        let title = document
            .select(&self.sel_title)
            .next()
            .map(text_of)
            .ok_or_else(|| anyhow::anyhow!("page has no <title>"))?;
        let last_modified = document
            .select(&self.sel_last_modified)
            .next()
            .map(text_of)
            .ok_or_else(|| anyhow::anyhow!("last-modified cell not found"))?;
        let target = document
            .select(&self.sel_target)
            .next()
            .map(|th| {
                th.next_siblings()
                    .filter_map(ElementRef::wrap)
                    .find(|e| e.value().name() == "td")
                    .map(text_of)
                    .unwrap_or_default()
            })
            .unwrap_or_else(|| UNKNOWN_TARGET.to_owned());

        let Some(last) = document.select(&self.sel_bugnote).last() else {
            return Ok(None);
        };

        let author = last
            .select(&self.sel_author)
            .next()
            .map(text_of)
            .ok_or_else(|| anyhow::anyhow!("bugnote author not found"))?;
        let time = last
            .select(&self.sel_time)
            .next()
            .map(|p| {
                p.text()
                    .collect::<String>()
                    .split_whitespace()
                    .take(2)
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .ok_or_else(|| anyhow::anyhow!("bugnote time label not found"))?;
        let body = last
            .select(&self.sel_note)
            .next()
            .map(|td| td.text().collect::<Vec<_>>().join("\n").trim().to_owned())
            .ok_or_else(|| anyhow::anyhow!("bugnote body not found"))?;

        Ok(Some(IssueSnapshot {
            title,
            last_modified,
            target,
            comment: Comment { author, time, body },
        }))
    }
}
