//! In-memory odds source for testing.
//!
//! Events are registered per sport; individual sports can be configured to
//! fail so that error paths can be exercised without network access.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rust_decimal::Decimal;
use time::OffsetDateTime;

use super::source::OddsSource;
use super::types::{BookmakerQuote, Event, Market, MarketType, Outcome, Sport};
use crate::error::OddsError;

/// Mock odds source.
#[derive(Debug, Clone, Default)]
pub struct MockOddsSource {
    sports: Arc<Mutex<Vec<Sport>>>,
    events: Arc<Mutex<HashMap<String, Vec<Event>>>>,
    failing: Arc<Mutex<HashSet<String>>>,
}

impl MockOddsSource {
    /// Create an empty mock source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a sport with its events.
    pub fn add_sport(&self, sport: Sport, events: Vec<Event>) {
        self.events
            .lock()
            .expect("mock lock poisoned")
            .insert(sport.key.clone(), events);
        self.sports.lock().expect("mock lock poisoned").push(sport);
    }

    /// Make fetching events for a sport fail.
    pub fn fail_sport(&self, sport_key: impl Into<String>) {
        self.failing
            .lock()
            .expect("mock lock poisoned")
            .insert(sport_key.into());
    }
}

#[async_trait]
impl OddsSource for MockOddsSource {
    async fn sports(&self) -> Result<Vec<Sport>, OddsError> {
        Ok(self.sports.lock().expect("mock lock poisoned").clone())
    }

    async fn events(&self, sport_key: &str) -> Result<Vec<Event>, OddsError> {
        if self
            .failing
            .lock()
            .expect("mock lock poisoned")
            .contains(sport_key)
        {
            return Err(OddsError::FetchFailed {
                sport: sport_key.to_string(),
                reason: "Mock fetch failure".to_string(),
            });
        }

        Ok(self
            .events
            .lock()
            .expect("mock lock poisoned")
            .get(sport_key)
            .cloned()
            .unwrap_or_default())
    }
}

/// Builder for test events.
#[derive(Debug, Clone)]
pub struct MockEventBuilder {
    event: Event,
}

impl MockEventBuilder {
    /// Start an event between two teams.
    pub fn new(id: impl Into<String>, home: impl Into<String>, away: impl Into<String>) -> Self {
        Self {
            event: Event {
                id: id.into(),
                sport_key: "basketball_nba".to_string(),
                sport_title: "NBA".to_string(),
                commence_time: OffsetDateTime::UNIX_EPOCH,
                home_team: home.into(),
                away_team: away.into(),
                bookmakers: Vec::new(),
            },
        }
    }

    /// Set the sport key and league title.
    pub fn sport(mut self, key: impl Into<String>, title: impl Into<String>) -> Self {
        self.event.sport_key = key.into();
        self.event.sport_title = title.into();
        self
    }

    /// Add a market quote for a bookmaker, creating the bookmaker on first use.
    pub fn quote(mut self, bookmaker: &str, market: MarketType, outcomes: Vec<Outcome>) -> Self {
        let key = bookmaker.to_lowercase().replace(' ', "_");
        let market = Market {
            key: market.to_string(),
            link: None,
            outcomes,
        };

        match self.event.bookmakers.iter_mut().find(|b| b.title == bookmaker) {
            Some(existing) => existing.markets.push(market),
            None => self.event.bookmakers.push(BookmakerQuote {
                link: Some(format!("https://{}.example.com/event", key)),
                key,
                title: bookmaker.to_string(),
                markets: vec![market],
            }),
        }
        self
    }

    /// Add a head-to-head quote.
    pub fn h2h(self, bookmaker: &str, prices: &[(&str, Decimal)]) -> Self {
        let outcomes = prices
            .iter()
            .map(|(name, price)| Outcome::new(*name, *price))
            .collect();
        self.quote(bookmaker, MarketType::H2h, outcomes)
    }

    /// Add a spreads or totals quote.
    pub fn lines(
        self,
        bookmaker: &str,
        market: MarketType,
        lines: &[(&str, Decimal, Decimal)],
    ) -> Self {
        let outcomes = lines
            .iter()
            .map(|(name, price, point)| Outcome::with_point(*name, *price, *point))
            .collect();
        self.quote(bookmaker, market, outcomes)
    }

    /// Build the event.
    pub fn build(self) -> Event {
        self.event
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn mock_source_returns_registered_events() {
        let source = MockOddsSource::new();
        let event = MockEventBuilder::new("e1", "A", "B")
            .h2h("X", &[("A", dec!(2.10)), ("B", dec!(1.80))])
            .build();
        source.add_sport(Sport::new("basketball_nba", "Basketball", "NBA"), vec![event]);

        assert_eq!(source.sports().await.unwrap().len(), 1);
        assert_eq!(source.events("basketball_nba").await.unwrap().len(), 1);
        assert!(source.events("unknown").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn mock_source_failure_mode() {
        let source = MockOddsSource::new();
        source.fail_sport("soccer_epl");

        let result = source.events("soccer_epl").await;
        assert!(matches!(result, Err(OddsError::FetchFailed { .. })));
    }

    #[test]
    fn event_builder_groups_markets_per_bookmaker() {
        let event = MockEventBuilder::new("e1", "A", "B")
            .h2h("Book X", &[("A", dec!(2.0)), ("B", dec!(2.0))])
            .lines(
                "Book X",
                MarketType::Totals,
                &[("Over", dec!(1.9), dec!(210.5)), ("Under", dec!(1.9), dec!(210.5))],
            )
            .build();

        assert_eq!(event.bookmakers.len(), 1);
        assert_eq!(event.bookmakers[0].key, "book_x");
        assert_eq!(event.bookmakers[0].markets.len(), 2);
        assert_eq!(event.bookmakers[0].markets[1].key, "totals");
    }
}
