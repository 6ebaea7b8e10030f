// tests/ingest_pipeline.rs
//
// Providers merged through fetch_all and then through the ledger.

use news_herald::ingest::fetch_all;
use news_herald::ingest::providers::{
    announcements::AnnouncementsProvider, rss::RssProvider, submissions::SubmissionsProvider,
};
use news_herald::ingest::types::{Category, SourceProvider};
use news_herald::ledger::Ledger;

const ANNOUNCEMENTS: &str = r#"{"data":{"catalogs":[{"articles":[
    {"id":7001,"code":"c0ffee","title":"Binance Will List FooCoin (FOO)","body":"FOO opens for spot trading.","releaseDate":1749542400000},
    {"id":7002,"code":"beef01","title":"Notice on Scheduled Wallet Maintenance","releaseDate":1749542400000}
]}]}}"#;

const FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0"><channel>
  <item>
    <title>binance will list foocoin (foo)</title>
    <link>https://www.binance.com/en/feed/post/1</link>
    <description>Same listing from the feed</description>
  </item>
  <item>
    <title>Weekly market recap</title>
    <link>https://www.binance.com/en/feed/post/2</link>
  </item>
</channel></rss>"#;

#[tokio::test]
async fn merged_sources_keep_order_and_drop_title_duplicates() {
    let providers: Vec<Box<dyn SourceProvider>> = vec![
        Box::new(AnnouncementsProvider::from_fixture_str(ANNOUNCEMENTS)),
        Box::new(RssProvider::from_fixture_str("<rss><channel>")),
        Box::new(RssProvider::from_fixture_str(FEED)),
    ];

    let all = fetch_all(&providers).await;
    let ids: Vec<&str> = all.iter().map(|c| c.id.as_str()).collect();

    assert_eq!(all.len(), 3, "{ids:?}");
    assert_eq!(ids[0], "binance-7001");
    assert_eq!(ids[1], "binance-7002");
    assert!(ids[2].starts_with("rss-"));
    assert_eq!(all[0].category, Category::Listing);
    assert_eq!(all[2].category, Category::Feed);
}

#[tokio::test]
async fn submissions_are_read_once_and_bypass_tagged() {
    let inbox = tempfile::tempdir().unwrap();
    std::fs::write(
        inbox.path().join("scoop.txt"),
        "Exchange X halts withdrawals\nSources confirm the halt started at 09:00 UTC.",
    )
    .unwrap();
    std::fs::write(inbox.path().join("notes.md"), "ignored").unwrap();

    let provider = SubmissionsProvider::new(inbox.path(), "https://site.test");
    let first = provider.fetch_latest().await.unwrap();
    assert_eq!(first.len(), 1);
    assert_eq!(first[0].id, "submission-scoop");
    assert_eq!(first[0].title, "[USER POST] Exchange X halts withdrawals");
    assert_eq!(first[0].category, Category::UserSubmitted);
    assert!(first[0].full_body.as_deref().unwrap().contains("09:00 UTC"));

    assert!(provider.fetch_latest().await.unwrap().is_empty());
    assert!(inbox.path().join("scoop.txt.done").exists());
}

#[tokio::test]
async fn seen_announcement_hides_the_feed_copy_next_cycle() {
    let dir = tempfile::tempdir().unwrap();
    let mut ledger = Ledger::open(dir.path().join("seen.json"));

    let cycle1: Vec<Box<dyn SourceProvider>> =
        vec![Box::new(AnnouncementsProvider::from_fixture_str(ANNOUNCEMENTS))];
    let fresh = ledger.filter_new(fetch_all(&cycle1).await);
    assert_eq!(fresh.len(), 2);
    ledger.mark_seen(&fresh);

    let cycle2: Vec<Box<dyn SourceProvider>> = vec![Box::new(RssProvider::from_fixture_str(FEED))];
    let fresh = ledger.filter_new(fetch_all(&cycle2).await);
    assert_eq!(fresh.len(), 1);
    assert_eq!(fresh[0].title, "Weekly market recap");
}
