//! Integration tests for the odds scanner.
//!
//! Each test drives a full scan pass through the public API using the mock
//! source or an offline snapshot file. No network access is needed.

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use pretty_assertions::assert_eq;
use rust_decimal_macros::dec;
use tower::ServiceExt;

use sports_arb::api::{create_router, AppState};
use sports_arb::detector::{Category, DetectionSettings, Opportunity};
use sports_arb::odds::{Event, MarketType, MockEventBuilder, MockOddsSource, OfflineSource, Sport};
use sports_arb::scanner::Scanner;
use sports_arb::sink::{CountStore, JsonFileStore, MemoryCountStore, MemoryStore, OpportunityStore};

fn nba() -> Sport {
    Sport::new("basketball_nba", "Basketball", "NBA")
}

fn epl() -> Sport {
    Sport::new("soccer_epl", "Soccer", "EPL")
}

/// Moneyline surebet worth 3.73 %.
fn surebet_event() -> Event {
    MockEventBuilder::new("nba-1", "Boston Celtics", "New York Knicks")
        .h2h("X", &[("Boston Celtics", dec!(2.10)), ("New York Knicks", dec!(1.80))])
        .h2h("Y", &[("Boston Celtics", dec!(1.75)), ("New York Knicks", dec!(2.05))])
        .build()
}

/// Totals middle on 211.
fn middle_event() -> Event {
    MockEventBuilder::new("nba-2", "Miami Heat", "Chicago Bulls")
        .lines("X", MarketType::Totals, &[("Over", dec!(2.10), dec!(210.5))])
        .lines("Y", MarketType::Totals, &[("Under", dec!(2.10), dec!(211.5))])
        .build()
}

/// Unibet overprices the home side against Pinnacle.
fn value_event() -> Event {
    MockEventBuilder::new("epl-1", "Arsenal", "Chelsea")
        .sport("soccer_epl", "EPL")
        .h2h("Pinnacle", &[("Arsenal", dec!(1.95)), ("Chelsea", dec!(1.95))])
        .h2h("Unibet", &[("Arsenal", dec!(2.20)), ("Chelsea", dec!(1.70))])
        .build()
}

fn mock_source() -> MockOddsSource {
    let source = MockOddsSource::new();
    source.add_sport(nba(), vec![surebet_event(), middle_event()]);
    source.add_sport(epl(), vec![value_event()]);
    source
}

fn memory_scanner(
    source: MockOddsSource,
) -> (Scanner, Arc<MemoryStore>, Arc<MemoryCountStore>) {
    let store = Arc::new(MemoryStore::new(Duration::from_secs(3600)));
    let counts = Arc::new(MemoryCountStore::new());
    let scanner = Scanner::new(
        Arc::new(source),
        store.clone(),
        counts.clone(),
        &DetectionSettings::default(),
    );
    (scanner, store, counts)
}

async fn items(store: &dyn OpportunityStore, category: Category) -> Vec<Opportunity> {
    store
        .latest(category)
        .await
        .unwrap()
        .map(|snapshot| snapshot.items.into_values().collect())
        .unwrap_or_default()
}

#[tokio::test]
async fn full_pass_publishes_every_category() {
    let (scanner, store, _) = memory_scanner(mock_source());

    let summary = scanner.scan_once().await.unwrap();

    assert_eq!(summary.sports_scanned, 2);
    assert_eq!(summary.events, 3);
    // the value event's best prices also lock in a surebet
    assert_eq!(summary.surebets, 2);
    assert_eq!(summary.middles, 1);
    assert_eq!(summary.valuebets, 1);
    assert_eq!(summary.failures, 0);

    let surebets = items(store.as_ref(), Category::Surebets).await;
    assert_eq!(surebets.len(), 2);
    assert!(surebets.iter().all(|o| o.category() == Category::Surebets));

    let middles = items(store.as_ref(), Category::Middles).await;
    assert_eq!(middles.len(), 1);
    assert_eq!(middles[0].header().event_id, "nba-2");

    let valuebets = items(store.as_ref(), Category::Valuebets).await;
    assert_eq!(valuebets.len(), 1);
    match &valuebets[0] {
        Opportunity::Valuebet(record) => {
            assert_eq!(record.bookmaker, "Unibet");
            assert_eq!(record.outcome, "Arsenal");
            assert_eq!(record.expected_value, dec!(10.00));
        }
        other => panic!("expected a valuebet, got {:?}", other.category()),
    }
}

#[tokio::test]
async fn repeated_pass_is_stable_and_nothing_is_fresh() {
    let (scanner, store, counts) = memory_scanner(mock_source());

    let first = scanner.scan_once().await.unwrap();
    let first_keys: Vec<String> = items(store.as_ref(), Category::Surebets)
        .await
        .iter()
        .map(|o| o.header().dedup_key.clone())
        .collect();

    let second = scanner.scan_once().await.unwrap();
    let second_keys: Vec<String> = items(store.as_ref(), Category::Surebets)
        .await
        .iter()
        .map(|o| o.header().dedup_key.clone())
        .collect();

    assert_eq!(first.surebets, second.surebets);
    assert_eq!(first.valuebets, second.valuebets);
    let mut first_keys = first_keys;
    let mut second_keys = second_keys;
    first_keys.sort();
    second_keys.sort();
    assert_eq!(first_keys, second_keys);

    let nba = counts.get("basketball_nba").unwrap();
    assert_eq!(nba.current.surebets, 1);
    assert_eq!(nba.current.middles, 1);
    assert_eq!(nba.fresh().total(), 0);
}

#[tokio::test]
async fn league_counts_are_per_sport() {
    let (scanner, _, counts) = memory_scanner(mock_source());

    scanner.scan_once().await.unwrap();

    let nba = counts.get("basketball_nba").unwrap();
    let epl = counts.get("soccer_epl").unwrap();
    assert_eq!(nba.current.surebets, 1);
    assert_eq!(nba.current.valuebets, 0);
    assert_eq!(epl.current.surebets, 1);
    assert_eq!(epl.current.valuebets, 1);
    assert_eq!(epl.current.middles, 0);
}

#[tokio::test]
async fn failing_sport_does_not_abort_pass() {
    let source = mock_source();
    source.fail_sport("basketball_nba");
    let (scanner, store, _) = memory_scanner(source);

    let summary = scanner.scan_once().await.unwrap();

    assert_eq!(summary.sports_failed, 1);
    assert_eq!(summary.sports_scanned, 1);
    assert_eq!(summary.valuebets, 1);
    assert!(items(store.as_ref(), Category::Middles).await.is_empty());
}

const SNAPSHOT: &str = r#"{
    "sports": [
        {"key": "basketball_nba", "group": "Basketball", "title": "NBA"},
        {"key": "golf_masters_winner", "group": "Golf", "title": "Masters", "has_outrights": true}
    ],
    "odds": {
        "basketball_nba": [{
            "id": "e1",
            "sport_key": "basketball_nba",
            "sport_title": "NBA",
            "commence_time": "2026-10-20T23:30:00Z",
            "home_team": "Boston Celtics",
            "away_team": "New York Knicks",
            "bookmakers": [
                {
                    "key": "draftkings",
                    "title": "DraftKings",
                    "markets": [{"key": "h2h", "outcomes": [
                        {"name": "Boston Celtics", "price": 2.10},
                        {"name": "New York Knicks", "price": 1.80}
                    ]}]
                },
                {
                    "key": "fanduel",
                    "title": "FanDuel",
                    "markets": [{"key": "h2h", "outcomes": [
                        {"name": "Boston Celtics", "price": 1.75},
                        {"name": "New York Knicks", "price": 2.05}
                    ]}]
                }
            ]
        }]
    }
}"#;

#[tokio::test]
async fn offline_snapshot_to_json_files() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(SNAPSHOT.as_bytes()).unwrap();
    let dir = tempfile::tempdir().unwrap();

    let store = Arc::new(JsonFileStore::new(dir.path(), Duration::from_secs(3600)));
    let scanner = Scanner::new(
        Arc::new(OfflineSource::new(file.path())),
        store.clone(),
        Arc::new(MemoryCountStore::new()),
        &DetectionSettings::default(),
    );

    let summary = scanner.scan_once().await.unwrap();
    assert_eq!(summary.sports_scanned, 1);
    assert_eq!(summary.surebets, 1);

    assert!(store.path_for(Category::Surebets).exists());
    assert!(store.path_for(Category::Middles).exists());

    let surebets = items(store.as_ref(), Category::Surebets).await;
    match &surebets[0] {
        Opportunity::Surebet(record) => assert_eq!(record.profit_margin, dec!(3.73)),
        other => panic!("expected a surebet, got {:?}", other.category()),
    }
}

#[tokio::test]
async fn api_serves_pass_results() {
    let (scanner, store, counts) = memory_scanner(mock_source());
    let app = create_router(AppState::new(scanner.status(), store, counts));

    let response = app
        .clone()
        .oneshot(Request::builder().uri("/ready").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

    scanner.scan_once().await.unwrap();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/v1/opportunities/valuebets")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["total"], 1);
    assert_eq!(json["items"][0]["type"], "valuebet");
    assert_eq!(json["items"][0]["bookmaker"], "Unibet");
}
