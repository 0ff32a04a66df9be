//! Middle detection on spreads and totals.
//!
//! A middle pairs one bookmaker's home (over) line with another bookmaker's
//! away (under) line. Both lines are mapped onto the same threshold axis:
//!
//! ```text
//! spreads: home -3.0 wins above 3, away +4.0 wins below 4  => window (3, 4)
//! totals:  over 210.5 wins above, under 212.5 wins below   => window (210.5, 212.5)
//! ```

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use tracing::{debug, info, instrument};

use super::record::{Category, MiddleRecord, OpportunityHeader};
use super::settings::MiddleSettings;
use super::{Detector, RunState};
use crate::error::DetectionError;
use crate::odds::{Event, MarketType, Sport};
use crate::pricing::probability::{combined_implied_probability, round_pct};
use crate::pricing::{extract, MarketBook};

/// Middle detector.
#[derive(Debug, Clone, Default)]
pub struct MiddleDetector {
    settings: MiddleSettings,
}

impl MiddleDetector {
    /// Create a detector.
    pub fn new(settings: MiddleSettings) -> Self {
        Self { settings }
    }
}

impl Detector for MiddleDetector {
    type Record = MiddleRecord;

    fn name(&self) -> &'static str {
        "middle"
    }

    fn detect(
        &self,
        event: &Event,
        sport: &Sport,
        markets: &[MarketType],
        run: &mut RunState,
    ) -> Result<Vec<MiddleRecord>, DetectionError> {
        find_middles(event, sport, markets, &self.settings, run)
    }
}

/// One quoted line and its price.
#[derive(Debug, Clone, Copy)]
struct Line {
    point: Decimal,
    price: Decimal,
}

/// Lines of one bookmaker, split by side.
#[derive(Debug, Default)]
struct BookLines {
    first: Vec<Line>,
    second: Vec<Line>,
}

/// Find middles on the spreads and totals markets of an event.
#[instrument(skip_all, fields(event = %event.id))]
pub fn find_middles(
    event: &Event,
    sport: &Sport,
    markets: &[MarketType],
    settings: &MiddleSettings,
    run: &mut RunState,
) -> Result<Vec<MiddleRecord>, DetectionError> {
    let max_window = settings.windows.max_window(&sport.group);
    let mut records = Vec::new();

    for &market in markets.iter().filter(|m| m.has_points()) {
        let book = extract(&event.bookmakers, market, event, run.matcher());
        let lines = split_lines(&book, market, event);

        for (first_book, first_lines) in &lines {
            for (second_book, second_lines) in &lines {
                if first_book == second_book {
                    continue;
                }

                for first in &first_lines.first {
                    for second in &second_lines.second {
                        if first.point.abs() == second.point.abs() {
                            continue;
                        }

                        let window = round_pct(window(market, first.point, second.point));
                        if window <= Decimal::ZERO || window > max_window {
                            continue;
                        }

                        let confidence =
                            round_pct((Decimal::ONE - window / max_window).max(Decimal::ZERO));
                        if confidence < settings.min_confidence {
                            continue;
                        }

                        let implied = combined_implied_probability([first.price, second.price])?;
                        let expected_value = round_pct((Decimal::ONE - implied) * Decimal::ONE_HUNDRED);
                        if expected_value <= Decimal::ZERO {
                            debug!(
                                market = %market,
                                first = %first.point,
                                second = %second.point,
                                ev = %expected_value,
                                "Middle has no edge"
                            );
                            continue;
                        }

                        let dedup_key = format!(
                            "{}|{}|{}|{}|{}",
                            event.home_team,
                            event.away_team,
                            market,
                            first.point.normalize(),
                            second.point.normalize()
                        );
                        if !run.seen(Category::Middles).insert(&dedup_key) {
                            continue;
                        }

                        info!(
                            event = %event.description(),
                            market = %market,
                            window = %window,
                            ev = %expected_value,
                            "Middle detected"
                        );

                        let mut links = BTreeMap::new();
                        for bookmaker in [first_book, second_book] {
                            if let Some(link) = book.link(bookmaker) {
                                links.insert(bookmaker.clone(), link.to_string());
                            }
                        }

                        records.push(MiddleRecord {
                            header: OpportunityHeader::new(event, sport, market, dedup_key),
                            bookmakers: (first_book.clone(), second_book.clone()),
                            first_line: first.point,
                            second_line: second.point,
                            first_price: first.price,
                            second_price: second.price,
                            window,
                            expected_value,
                            confidence,
                            links,
                        });
                    }
                }
            }
        }
    }

    Ok(records)
}

/// Width of the range where both legs win.
fn window(market: MarketType, first: Decimal, second: Decimal) -> Decimal {
    match market {
        MarketType::Spreads => second - (-first),
        _ => second - first,
    }
}

/// Per-bookmaker home/over and away/under lines.
fn split_lines(book: &MarketBook, market: MarketType, event: &Event) -> BTreeMap<String, BookLines> {
    let (first_side, second_side) = match market {
        MarketType::Totals => ("Over", "Under"),
        _ => (event.home_team.as_str(), event.away_team.as_str()),
    };

    book.books
        .iter()
        .map(|(bookmaker, prices)| {
            let mut lines = BookLines::default();
            for (key, price) in prices {
                let Some(point) = key.point else { continue };
                let line = Line {
                    point,
                    price: *price,
                };
                if key.name == first_side {
                    lines.first.push(line);
                } else if key.name == second_side {
                    lines.second.push(line);
                }
            }
            (bookmaker.clone(), lines)
        })
        .collect()
}
