//! Poll cycles against a mock tracker, with the browser login, translation
//! service and Slack replaced by in-process doubles.

use std::sync::{
    Mutex,
    atomic::{AtomicUsize, Ordering},
};

use mockito::{Matcher, Mock, Server, ServerGuard};
use mrelay::{
    auth::Authenticator,
    notify::Notifier,
    poller::{Outcome, Poller, Rules},
    translate::Translator,
};
use reqwest::Client;

#[derive(Default)]
struct FakeLogin {
    calls: AtomicUsize,
    fail: bool,
}

impl Authenticator for FakeLogin {
    async fn authenticate(&self) -> anyhow::Result<Client> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            anyhow::bail!("chrome exited");
        }
        Ok(Client::new())
    }
}

/// Tags text instead of translating; can be switched to always fail.
#[derive(Default)]
struct Tagger {
    broken: bool,
}

impl Translator for Tagger {
    async fn translate(&self, text: &str) -> anyhow::Result<String> {
        if self.broken {
            anyhow::bail!("service unavailable");
        }
        Ok(format!("[ja]{text}"))
    }
}

#[derive(Default)]
struct Inbox {
    messages: Mutex<Vec<String>>,
    fail: bool,
}

impl Notifier for &Inbox {
    async fn send(&self, text: &str) -> anyhow::Result<()> {
        self.messages.lock().unwrap().push(text.to_owned());
        if self.fail {
            anyhow::bail!("webhook returned 500");
        }
        Ok(())
    }
}

impl Inbox {
    fn count(&self) -> usize {
        self.messages.lock().unwrap().len()
    }
}

fn rss(link: &str, pub_date: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0"><channel><title>Mantis - demo</title><link>http://tracker.local/</link><description>issues</description>
<item><title>0000099: old</title><link>http://tracker.local/view.php?id=99</link><pubDate>Thu, 29 Feb 2024 10:00:00 +0900</pubDate></item>
<item><title>0001234: new</title><link>{link}</link><pubDate>{pub_date}</pubDate></item>
</channel></rss>"#
    )
}

fn issue_page(last_modified: &str, notes: &[(&str, &str, &str)]) -> String {
    let mut rows = String::new();
    for (author, time, body) in notes {
        rows.push_str(&format!(
            r#"<tr class="bugnote"><td class="bugnote-public"><a href="view_user_page.php?id=2" title="{author}">{author}</a>
<p class="small lighter">{time} <a href="">~1</a></p></td><td class="bugnote-note">{body}</td></tr>"#
        ));
    }
    format!(
        r#"<html><head><title>0001234: 로그인 실패 - MantisBT</title></head><body>
<table><tr><th class="bug-last-modified category">Updated</th><td class="bug-last-modified">{last_modified}</td></tr>
<tr><th class="bug-target-version category">Target Version</th><td>2.0</td></tr></table>
<table>{rows}</table></body></html>"#
    )
}

async fn serve_feed(server: &mut ServerGuard, pub_date: &str) -> Mock {
    let link = format!("{}/view.php?id=1234", server.url());
    server
        .mock("GET", "/issues_rss.php")
        .with_status(200)
        .with_header("content-type", "application/rss+xml")
        .with_body(rss(&link, pub_date))
        .create_async()
        .await
}

async fn serve_issue(server: &mut ServerGuard, page: String, hits: usize) -> Mock {
    server
        .mock("GET", "/view.php")
        .match_query(Matcher::UrlEncoded("id".into(), "1234".into()))
        .expect(hits)
        .with_status(200)
        .with_header("content-type", "text/html; charset=utf-8")
        .with_body(page)
        .create_async()
        .await
}

fn poller<'a>(
    server: &ServerGuard,
    login: FakeLogin,
    tagger: Tagger,
    inbox: &'a Inbox,
) -> Poller<FakeLogin, Tagger, &'a Inbox> {
    Poller::new(
        Client::new(),
        format!("{}/issues_rss.php", server.url()),
        login,
        tagger,
        inbox,
        Rules::default(),
    )
    .unwrap()
}

const T1: &str = "Fri, 01 Mar 2024 09:05:30 +0900";
const T2: &str = "Fri, 01 Mar 2024 09:20:00 +0900";

#[tokio::test]
async fn new_comment_is_relayed_once() {
    let mut server = Server::new_async().await;
    let _feed = serve_feed(&mut server, T1).await;
    let issue = serve_issue(
        &mut server,
        issue_page("2024-03-01 09:05", &[
            ("kim", "2024-02-28 18:00", "first"),
            ("이영희", "2024-03-01 09:05", "재현됩니다<br>로그 첨부"),
        ]),
        1,
    )
    .await;

    let inbox = Inbox::default();
    let mut poller = poller(&server, FakeLogin::default(), Tagger::default(), &inbox);

    assert_eq!(
        poller.poll().await,
        Outcome::Delivered {
            issue_id: "1234".to_owned(),
            sent: true
        }
    );
    assert!(poller.sent().contains("1234_2024-03-01 09:05"));

    let messages = inbox.messages.lock().unwrap().clone();
    assert_eq!(messages.len(), 1);
    let expected = format!(
        "🔗 {}/view.php?id=1234\n\
         📝 [ja]0001234: 로그인 실패 - MantisBT\n\
         📝 0001234: 로그인 실패 - MantisBT\n\
         🎯 target : 2.0 🧑‍💻 [이영희] [ja]이영희\n\
         🇯🇵\n```[ja]재현됩니다\n로그 첨부```\n\
         🇰🇷\n```재현됩니다\n로그 첨부```",
        server.url()
    );
    assert_eq!(messages[0], expected);

    // Same feed again: stopped at the high-water mark, page not refetched.
    assert_eq!(poller.poll().await, Outcome::Stale);
    assert_eq!(inbox.count(), 1);
    issue.assert_async().await;
}

#[tokio::test]
async fn same_comment_under_newer_entry_is_a_duplicate() {
    let mut server = Server::new_async().await;
    let feed = serve_feed(&mut server, T1).await;
    let page = issue_page("2024-03-01 09:06", &[("lee", "2024-03-01 09:05", "body")]);
    let _issue = serve_issue(&mut server, page, 1).await;

    let inbox = Inbox::default();
    let mut poller = poller(&server, FakeLogin::default(), Tagger::default(), &inbox);
    assert!(matches!(poller.poll().await, Outcome::Delivered { .. }));

    feed.remove_async().await;
    let _feed = serve_feed(&mut server, T2).await;
    assert_eq!(poller.poll().await, Outcome::Duplicate);
    assert_eq!(inbox.count(), 1);
}

#[tokio::test]
async fn issue_without_bugnotes_reports_nothing() {
    let mut server = Server::new_async().await;
    let _feed = serve_feed(&mut server, T1).await;
    let _issue = serve_issue(&mut server, issue_page("2024-03-01 09:05", &[]), 1).await;

    let inbox = Inbox::default();
    let mut poller = poller(&server, FakeLogin::default(), Tagger::default(), &inbox);
    assert_eq!(poller.poll().await, Outcome::NoComment);
    assert_eq!(inbox.count(), 0);
}

#[tokio::test]
async fn modification_long_after_comment_is_ignored() {
    let mut server = Server::new_async().await;
    let _feed = serve_feed(&mut server, T1).await;
    let page = issue_page("2024-03-01 09:10", &[("lee", "2024-03-01 09:05", "body")]);
    let _issue = serve_issue(&mut server, page, 1).await;

    let inbox = Inbox::default();
    let mut poller = poller(&server, FakeLogin::default(), Tagger::default(), &inbox);
    assert_eq!(poller.poll().await, Outcome::Unrelated);
    assert_eq!(inbox.count(), 0);
    assert!(poller.sent().is_empty());
}

#[tokio::test]
async fn unreadable_timestamp_stops_cycle() {
    let mut server = Server::new_async().await;
    let _feed = serve_feed(&mut server, T1).await;
    let page = issue_page("yesterday", &[("lee", "2024-03-01 09:05", "body")]);
    let _issue = serve_issue(&mut server, page, 1).await;

    let inbox = Inbox::default();
    let mut poller = poller(&server, FakeLogin::default(), Tagger::default(), &inbox);
    assert_eq!(poller.poll().await, Outcome::BadTimestamp);
    assert_eq!(inbox.count(), 0);
}

#[tokio::test]
async fn broken_translation_sends_originals() {
    let mut server = Server::new_async().await;
    let _feed = serve_feed(&mut server, T1).await;
    let page = issue_page("2024-03-01 09:05", &[("lee", "2024-03-01 09:05", "원문")]);
    let _issue = serve_issue(&mut server, page, 1).await;

    let inbox = Inbox::default();
    let mut poller = poller(&server, FakeLogin::default(), Tagger { broken: true }, &inbox);
    assert!(matches!(poller.poll().await, Outcome::Delivered { sent: true, .. }));

    let messages = inbox.messages.lock().unwrap();
    assert!(messages[0].contains("🇯🇵\n```원문```"));
    assert!(messages[0].contains("[lee] lee"));
}

#[tokio::test]
async fn failed_delivery_is_not_retried() {
    let mut server = Server::new_async().await;
    let feed = serve_feed(&mut server, T1).await;
    let page = issue_page("2024-03-01 09:05", &[("lee", "2024-03-01 09:05", "body")]);
    let _issue = serve_issue(&mut server, page, 1).await;

    let inbox = Inbox {
        fail: true,
        ..Inbox::default()
    };
    let mut poller = poller(&server, FakeLogin::default(), Tagger::default(), &inbox);
    assert_eq!(
        poller.poll().await,
        Outcome::Delivered {
            issue_id: "1234".to_owned(),
            sent: false
        }
    );

    feed.remove_async().await;
    let _feed = serve_feed(&mut server, T2).await;
    assert_eq!(poller.poll().await, Outcome::Duplicate);
    assert_eq!(inbox.count(), 1);
}

#[tokio::test]
async fn feed_outage_keeps_high_water_mark() {
    let mut server = Server::new_async().await;
    let _feed = server
        .mock("GET", "/issues_rss.php")
        .with_status(502)
        .create_async()
        .await;

    let inbox = Inbox::default();
    let mut poller = poller(&server, FakeLogin::default(), Tagger::default(), &inbox);
    assert_eq!(poller.poll().await, Outcome::FeedUnavailable);
    assert_eq!(poller.high_water(), None);
}

#[tokio::test]
async fn login_failure_abandons_only_this_entry() {
    let mut server = Server::new_async().await;
    let _feed = serve_feed(&mut server, T1).await;
    let issue = serve_issue(&mut server, issue_page("2024-03-01 09:05", &[]), 0).await;

    let inbox = Inbox::default();
    let login = FakeLogin {
        fail: true,
        ..FakeLogin::default()
    };
    let mut poller = poller(&server, login, Tagger::default(), &inbox);
    assert_eq!(poller.poll().await, Outcome::IssueUnavailable);
    assert!(poller.high_water().is_some());

    assert_eq!(poller.poll().await, Outcome::Stale);
    issue.assert_async().await;
}

#[tokio::test]
async fn empty_feed_does_nothing() {
    let mut server = Server::new_async().await;
    let _feed = server
        .mock("GET", "/issues_rss.php")
        .with_status(200)
        .with_body(r#"<rss version="2.0"><channel><title>t</title><link>l</link><description>d</description></channel></rss>"#)
        .create_async()
        .await;

    let inbox = Inbox::default();
    let mut poller = poller(&server, FakeLogin::default(), Tagger::default(), &inbox);
    assert_eq!(poller.poll().await, Outcome::EmptyFeed);
}

struct Explosive;

impl Notifier for Explosive {
    async fn send(&self, _text: &str) -> anyhow::Result<()> {
        panic!("webhook client blew up");
    }
}

#[tokio::test]
async fn loop_survives_panicking_cycle() {
    let mut server = Server::new_async().await;
    let link = format!("{}/view.php?id=1234", server.url());
    let feed = server
        .mock("GET", "/issues_rss.php")
        .expect_at_least(2)
        .with_status(200)
        .with_header("content-type", "application/rss+xml")
        .with_body(rss(&link, T1))
        .create_async()
        .await;
    let _issue = serve_issue(
        &mut server,
        issue_page("2024-03-01 09:06", &[("lee", "2024-03-01 09:05", "body")]),
        1,
    )
    .await;

    let poller = Poller::new(
        Client::new(),
        format!("{}/issues_rss.php", server.url()),
        FakeLogin::default(),
        Tagger::default(),
        Explosive,
        Rules::default(),
    )
    .unwrap();

    let stopped = tokio::time::timeout(
        std::time::Duration::from_millis(1500),
        poller.run(std::time::Duration::from_millis(200)),
    )
    .await;

    assert!(stopped.is_err(), "run returned on its own");
    feed.assert_async().await;
}
