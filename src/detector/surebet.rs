//! Surebet detection: complete outcome sets whose best prices sum below 1.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use tracing::{debug, info, instrument};

use super::record::{Category, OpportunityHeader, SurebetPoints, SurebetRecord};
use super::settings::SurebetSettings;
use super::{Detector, RunState};
use crate::error::DetectionError;
use crate::odds::{Event, MarketType, Sport};
use crate::pricing::probability::{combined_implied_probability, profit_margin, round_pct};
use crate::pricing::{extract, BestPrice, MarketBook, OutcomeKey};

/// Surebet detector.
#[derive(Debug, Clone, Default)]
pub struct SurebetDetector {
    settings: SurebetSettings,
}

impl SurebetDetector {
    /// Create a detector.
    pub fn new(settings: SurebetSettings) -> Self {
        Self { settings }
    }
}

impl Detector for SurebetDetector {
    type Record = SurebetRecord;

    fn name(&self) -> &'static str {
        "surebet"
    }

    fn detect(
        &self,
        event: &Event,
        sport: &Sport,
        markets: &[MarketType],
        run: &mut RunState,
    ) -> Result<Vec<SurebetRecord>, DetectionError> {
        find_surebets(event, sport, markets, &self.settings, run)
    }
}

/// Outcome set priced at the best available odds.
#[derive(Debug, Clone)]
struct Candidate {
    legs: Vec<(OutcomeKey, BestPrice)>,
    implied: Decimal,
    points: Option<SurebetPoints>,
}

/// Find surebets on every requested market of an event.
#[instrument(skip_all, fields(event = %event.id))]
pub fn find_surebets(
    event: &Event,
    sport: &Sport,
    markets: &[MarketType],
    settings: &SurebetSettings,
    run: &mut RunState,
) -> Result<Vec<SurebetRecord>, DetectionError> {
    let mut records = Vec::new();

    for &market in markets {
        let book = extract(&event.bookmakers, market, event, run.matcher());
        if book.is_empty() {
            continue;
        }

        let candidate = match market {
            MarketType::H2h => h2h_candidate(&book)?,
            MarketType::Totals => totals_candidate(&book)?,
            MarketType::Spreads => spreads_candidate(&book, event, settings.spread_tolerance)?,
        };

        let Some(candidate) = candidate else {
            continue;
        };

        if candidate.implied >= Decimal::ONE {
            debug!(market = %market, implied = %candidate.implied, "No surebet");
            continue;
        }

        let Some(margin) = profit_margin(candidate.implied).map(round_pct) else {
            continue;
        };
        if margin < settings.min_profit_margin {
            debug!(
                market = %market,
                margin = %margin,
                min = %settings.min_profit_margin,
                "Surebet below minimum margin"
            );
            continue;
        }

        let dedup_key = dedup_key(event, market, &candidate.legs);
        if !run.seen(Category::Surebets).insert(&dedup_key) {
            debug!(key = %dedup_key, "Duplicate surebet");
            continue;
        }

        info!(
            event = %event.description(),
            market = %market,
            margin = %margin,
            "Surebet detected"
        );

        records.push(build_record(event, sport, market, &book, candidate, margin, dedup_key));
    }

    Ok(records)
}

fn h2h_candidate(book: &MarketBook) -> Result<Option<Candidate>, DetectionError> {
    let legs: Vec<(OutcomeKey, BestPrice)> = book.best_prices().into_iter().collect();
    if legs.len() < 2 || distinct_bookmakers(&legs) < 2 {
        return Ok(None);
    }
    let implied = combined_implied_probability(legs.iter().map(|(_, b)| b.price))?;
    Ok(Some(Candidate {
        legs,
        implied,
        points: None,
    }))
}

fn totals_candidate(book: &MarketBook) -> Result<Option<Candidate>, DetectionError> {
    let best = book.best_prices();
    let mut chosen: Option<Candidate> = None;

    for (key, over) in best.iter().filter(|(k, _)| k.name == "Over") {
        let Some(point) = key.point else { continue };
        let under_key = OutcomeKey::with_point("Under", point);
        let Some(under) = best.get(&under_key) else {
            continue;
        };
        if over.bookmaker == under.bookmaker {
            continue;
        }

        let implied = combined_implied_probability([over.price, under.price])?;
        if chosen.as_ref().map_or(true, |c| implied < c.implied) {
            chosen = Some(Candidate {
                legs: vec![(key.clone(), over.clone()), (under_key, under.clone())],
                implied,
                points: Some(SurebetPoints::Total { point }),
            });
        }
    }

    Ok(chosen)
}

fn spreads_candidate(
    book: &MarketBook,
    event: &Event,
    tolerance: Decimal,
) -> Result<Option<Candidate>, DetectionError> {
    let best = book.best_prices();
    let homes = team_lines(&best, &event.home_team);
    let aways = team_lines(&best, &event.away_team);

    let mut chosen: Option<Candidate> = None;
    for (home_key, home, home_point) in &homes {
        for (away_key, away, away_point) in &aways {
            if !points_consistent(*home_point, *away_point, tolerance) {
                continue;
            }
            if home.bookmaker == away.bookmaker {
                continue;
            }

            let implied = combined_implied_probability([home.price, away.price])?;
            if chosen.as_ref().map_or(true, |c| implied < c.implied) {
                chosen = Some(Candidate {
                    legs: vec![
                        ((*home_key).clone(), (*home).clone()),
                        ((*away_key).clone(), (*away).clone()),
                    ],
                    implied,
                    points: Some(SurebetPoints::Spread {
                        home: *home_point,
                        away: *away_point,
                    }),
                });
            }
        }
    }

    Ok(chosen)
}

fn team_lines<'a>(
    best: &'a BTreeMap<OutcomeKey, BestPrice>,
    team: &str,
) -> Vec<(&'a OutcomeKey, &'a BestPrice, Decimal)> {
    best.iter()
        .filter(|(k, _)| k.name == team)
        .filter_map(|(k, b)| k.point.map(|p| (k, b, p)))
        .collect()
}

/// Opposite-signed handicaps, or handicaps that nearly cancel out.
fn points_consistent(home: Decimal, away: Decimal, tolerance: Decimal) -> bool {
    let opposite = !home.is_zero()
        && !away.is_zero()
        && home.is_sign_negative() != away.is_sign_negative();
    opposite || (home + away).abs() <= tolerance
}

fn distinct_bookmakers(legs: &[(OutcomeKey, BestPrice)]) -> usize {
    let mut names: Vec<&str> = legs.iter().map(|(_, b)| b.bookmaker.as_str()).collect();
    names.sort_unstable();
    names.dedup();
    names.len()
}

fn dedup_key(event: &Event, market: MarketType, legs: &[(OutcomeKey, BestPrice)]) -> String {
    let legs: Vec<String> = legs
        .iter()
        .map(|(key, best)| format!("{}={}", key, best.bookmaker))
        .collect();
    format!("{}|{}|{}", event.id, market, legs.join(","))
}

fn build_record(
    event: &Event,
    sport: &Sport,
    market: MarketType,
    book: &MarketBook,
    candidate: Candidate,
    margin: Decimal,
    dedup_key: String,
) -> SurebetRecord {
    let mut best_odds = BTreeMap::new();
    let mut bookmakers = BTreeMap::new();
    let mut links = BTreeMap::new();

    for (key, best) in candidate.legs {
        let outcome = key.to_string();
        if let Some(link) = book.link(&best.bookmaker) {
            links.insert(best.bookmaker.clone(), link.to_string());
        }
        best_odds.insert(outcome.clone(), best.price);
        bookmakers.insert(outcome, best.bookmaker);
    }

    SurebetRecord {
        header: OpportunityHeader::new(event, sport, market, dedup_key),
        profit_margin: margin,
        implied_probability: candidate.implied,
        best_odds,
        bookmakers,
        links,
        points: candidate.points,
    }
}
