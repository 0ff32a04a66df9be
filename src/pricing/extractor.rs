//! Normalisation of raw bookmaker quotes into a per-market price table.

use std::collections::{BTreeMap, BTreeSet};

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tracing::{instrument, trace};
use url::Url;

use super::key::OutcomeKey;
use super::names::TeamMatcher;
use crate::odds::{BookmakerQuote, Event, MarketType, Outcome};

/// Prices above this are feed errors, not odds.
pub const MAX_PRICE: Decimal = dec!(1000);

/// Best available price for an outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BestPrice {
    /// Decimal price.
    pub price: Decimal,
    /// Bookmaker title offering it.
    pub bookmaker: String,
}

/// Prices of one market type across every bookmaker of an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarketBook {
    /// Market type the table was built for.
    pub market: MarketType,
    /// Bookmaker title -> outcome -> price.
    pub books: BTreeMap<String, BTreeMap<OutcomeKey, Decimal>>,
    /// Bookmaker title -> deep link.
    pub links: BTreeMap<String, String>,
    /// Bookmaker title -> feed key.
    pub keys: BTreeMap<String, String>,
}

impl MarketBook {
    /// Empty table for a market.
    pub fn new(market: MarketType) -> Self {
        Self {
            market,
            books: BTreeMap::new(),
            links: BTreeMap::new(),
            keys: BTreeMap::new(),
        }
    }

    /// Whether no bookmaker quoted a usable price.
    pub fn is_empty(&self) -> bool {
        self.books.is_empty()
    }

    /// Highest price per outcome. Ties keep the first bookmaker in name order.
    pub fn best_prices(&self) -> BTreeMap<OutcomeKey, BestPrice> {
        let mut best: BTreeMap<OutcomeKey, BestPrice> = BTreeMap::new();
        for (bookmaker, prices) in &self.books {
            for (key, price) in prices {
                match best.get_mut(key) {
                    Some(current) if *price <= current.price => {}
                    Some(current) => {
                        current.price = *price;
                        current.bookmaker = bookmaker.clone();
                    }
                    None => {
                        best.insert(
                            key.clone(),
                            BestPrice {
                                price: *price,
                                bookmaker: bookmaker.clone(),
                            },
                        );
                    }
                }
            }
        }
        best
    }

    /// Every bookmaker's price for an outcome.
    pub fn prices_for(&self, key: &OutcomeKey) -> Vec<(&str, Decimal)> {
        self.books
            .iter()
            .filter_map(|(bookmaker, prices)| prices.get(key).map(|p| (bookmaker.as_str(), *p)))
            .collect()
    }

    /// Number of bookmakers quoting an outcome.
    pub fn quoting_books(&self, key: &OutcomeKey) -> usize {
        self.books.values().filter(|p| p.contains_key(key)).count()
    }

    /// Union of outcomes quoted by any bookmaker.
    pub fn outcome_keys(&self) -> BTreeSet<OutcomeKey> {
        self.books
            .values()
            .flat_map(|prices| prices.keys().cloned())
            .collect()
    }

    /// Deep link for a bookmaker.
    pub fn link(&self, bookmaker: &str) -> Option<&str> {
        self.links.get(bookmaker).map(String::as_str)
    }

    /// Feed key for a bookmaker.
    pub fn key_of(&self, bookmaker: &str) -> Option<&str> {
        self.keys.get(bookmaker).map(String::as_str)
    }
}

/// Build the price table for one market type.
///
/// Malformed rows (missing name or price, price at or below 1, a line market
/// without a point, an unresolvable team) are skipped.
#[instrument(skip_all, fields(event = %event.id, market = %market))]
pub fn extract(
    quotes: &[BookmakerQuote],
    market: MarketType,
    event: &Event,
    matcher: &mut dyn TeamMatcher,
) -> MarketBook {
    let mut book = MarketBook::new(market);

    for quote in quotes {
        for quoted in quote.markets.iter().filter(|m| m.market_type() == Some(market)) {
            let mut prices: BTreeMap<OutcomeKey, Decimal> = BTreeMap::new();

            for outcome in &quoted.outcomes {
                let Some((key, price)) = outcome_price(outcome, market, event, matcher) else {
                    trace!(bookmaker = %quote.title, ?outcome, "Skipping outcome row");
                    continue;
                };
                prices
                    .entry(key)
                    .and_modify(|p| *p = (*p).max(price))
                    .or_insert(price);
            }

            if prices.is_empty() {
                continue;
            }

            let entry = book.books.entry(quote.title.clone()).or_default();
            for (key, price) in prices {
                entry
                    .entry(key)
                    .and_modify(|p| *p = (*p).max(price))
                    .or_insert(price);
            }

            book.keys
                .entry(quote.title.clone())
                .or_insert_with(|| quote.key.clone());

            if !book.links.contains_key(&quote.title) {
                let link = quoted
                    .link
                    .as_deref()
                    .and_then(valid_link)
                    .or_else(|| quote.link.as_deref().and_then(valid_link));
                if let Some(link) = link {
                    book.links.insert(quote.title.clone(), link);
                }
            }
        }
    }

    book
}

fn outcome_price(
    outcome: &Outcome,
    market: MarketType,
    event: &Event,
    matcher: &mut dyn TeamMatcher,
) -> Option<(OutcomeKey, Decimal)> {
    let name = outcome.name.as_deref()?.trim();
    let price = outcome.price?;
    if name.is_empty() || price <= Decimal::ONE || price > MAX_PRICE {
        return None;
    }

    let key = match market {
        MarketType::H2h => OutcomeKey::named(name),
        MarketType::Totals => {
            let point = outcome.point?;
            let side = if name.eq_ignore_ascii_case("over") {
                "Over"
            } else if name.eq_ignore_ascii_case("under") {
                "Under"
            } else {
                return None;
            };
            OutcomeKey::with_point(side, point)
        }
        MarketType::Spreads => {
            let point = outcome.point?;
            let team = matcher.resolve(name, &event.home_team, &event.away_team)?;
            OutcomeKey::with_point(team, point)
        }
    };

    Some((key, price))
}

/// Keep only absolute http(s) links.
fn valid_link(raw: &str) -> Option<String> {
    let raw = raw.trim();
    let url = Url::parse(raw).ok()?;
    let web = matches!(url.scheme(), "http" | "https") && url.host_str().is_some();
    web.then(|| raw.to_string())
}
