//! Valuebet detection against a de-vigged reference price.
//!
//! The reference is the highest-priority sharp bookmaker quoting the market,
//! or the average over enough bookmakers when no sharp book is present. Each
//! other bookmaker's price is then compared to the fair probability, with a
//! threshold that tightens when books disagree or the league is low tier.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tracing::{debug, info, instrument};

use super::record::{Category, OpportunityHeader, ReferenceSource, ValuebetRecord};
use super::settings::ValueSettings;
use super::{Detector, RunState};
use crate::error::DetectionError;
use crate::odds::{Event, MarketType, Sport};
use crate::pricing::probability::{
    coefficient_of_variation, devig, expected_value, implied_probability, mean, round_pct,
    round_to,
};
use crate::pricing::{extract, MarketBook, OutcomeKey};

/// Agreement score when fewer than three books quote an outcome.
const DEFAULT_AGREEMENT: Decimal = dec!(0.7);
/// Agreement score clamp.
const MIN_AGREEMENT: Decimal = dec!(0.3);
/// Confidence factor of the market-average reference.
const AVERAGE_SOURCE_FACTOR: Decimal = dec!(0.7);
/// Confidence factor of low-tier leagues.
const LOW_TIER_FACTOR: Decimal = dec!(0.9);

/// Valuebet detector.
#[derive(Debug, Clone, Default)]
pub struct ValuebetDetector {
    settings: ValueSettings,
}

impl ValuebetDetector {
    /// Create a detector.
    pub fn new(settings: ValueSettings) -> Self {
        Self { settings }
    }
}

impl Detector for ValuebetDetector {
    type Record = ValuebetRecord;

    fn name(&self) -> &'static str {
        "valuebet"
    }

    fn detect(
        &self,
        event: &Event,
        sport: &Sport,
        markets: &[MarketType],
        run: &mut RunState,
    ) -> Result<Vec<ValuebetRecord>, DetectionError> {
        find_valuebets(event, sport, markets, &self.settings, run)
    }
}

/// Reference prices and their origin.
#[derive(Debug, Clone)]
struct Reference {
    source: ReferenceSource,
    prices: BTreeMap<OutcomeKey, Decimal>,
}

/// Fair probability of an outcome with the reference price it came from.
#[derive(Debug, Clone, Copy)]
struct Fair {
    probability: Decimal,
    reference_price: Decimal,
}

/// Find valuebets on every requested market of an event.
#[instrument(skip_all, fields(event = %event.id))]
pub fn find_valuebets(
    event: &Event,
    sport: &Sport,
    markets: &[MarketType],
    settings: &ValueSettings,
    run: &mut RunState,
) -> Result<Vec<ValuebetRecord>, DetectionError> {
    let low_tier = settings
        .tier
        .is_low_tier(&event.sport_key, &event.sport_title, &sport.group)
        || settings.tier.is_low_tier(&sport.key, &sport.title, &sport.group);
    let mut records = Vec::new();

    for &market in markets {
        let book = extract(&event.bookmakers, market, event, run.matcher());
        if book.is_empty() {
            continue;
        }

        let Some(reference) = reference(&book, settings) else {
            debug!(market = %market, "No usable reference");
            continue;
        };

        let fair = fair_probabilities(&reference, market, event)?;
        if fair.is_empty() {
            continue;
        }

        let sharp = reference.source.is_sharp();
        for (bookmaker, prices) in &book.books {
            let key = book.key_of(bookmaker).unwrap_or_default();
            if settings.is_sharp(bookmaker, key) {
                continue;
            }

            for (outcome, &price) in prices {
                let Some(quote) = fair.get(outcome) else {
                    continue;
                };

                if price <= Decimal::ONE || price > settings.max_odds {
                    continue;
                }

                let ev = expected_value(price, quote.probability);
                if ev > settings.max_ev {
                    debug!(bookmaker = %bookmaker, outcome = %outcome, ev = %ev, "EV implausibly high");
                    continue;
                }

                let agreement = agreement_score(&book, outcome);
                let threshold = threshold(settings, sharp, agreement, low_tier);
                if ev < threshold {
                    continue;
                }

                if price > quote.reference_price * settings.max_reference_ratio {
                    debug!(
                        bookmaker = %bookmaker,
                        outcome = %outcome,
                        price = %price,
                        reference = %quote.reference_price,
                        "Price too far above reference"
                    );
                    continue;
                }

                let dedup_key = format!("{}|{}|{}|{}", event.id, bookmaker, outcome, market);
                if !run.seen(Category::Valuebets).insert(&dedup_key) {
                    continue;
                }

                let confidence = confidence(settings, ev, sharp, agreement, low_tier);
                info!(
                    event = %event.description(),
                    bookmaker = %bookmaker,
                    outcome = %outcome,
                    ev = %ev,
                    "Valuebet detected"
                );

                records.push(ValuebetRecord {
                    header: OpportunityHeader::new(event, sport, market, dedup_key),
                    bookmaker: bookmaker.clone(),
                    outcome: outcome.to_string(),
                    point: outcome.point,
                    odds: price,
                    reference_odds: round_to(quote.reference_price, 3),
                    fair_probability: round_to(quote.probability, 4),
                    expected_value: round_pct(ev * Decimal::ONE_HUNDRED),
                    threshold: round_pct(threshold * Decimal::ONE_HUNDRED),
                    confidence,
                    reference: reference.source.clone(),
                    link: book.link(bookmaker).map(str::to_string),
                });
            }
        }
    }

    Ok(records)
}

/// Sharp bookmaker prices, or the per-outcome average over enough books.
fn reference(book: &MarketBook, settings: &ValueSettings) -> Option<Reference> {
    let sharp = book
        .books
        .keys()
        .filter_map(|title| {
            let key = book.key_of(title).unwrap_or_default();
            settings.sharp_rank(title, key).map(|rank| (rank, title))
        })
        .min_by_key(|(rank, _)| *rank);

    if let Some((_, title)) = sharp {
        return Some(Reference {
            source: ReferenceSource::Sharp {
                bookmaker: title.clone(),
            },
            prices: book.books.get(title)?.clone(),
        });
    }

    let prices: BTreeMap<OutcomeKey, Decimal> = book
        .outcome_keys()
        .into_iter()
        .filter(|key| book.quoting_books(key) >= settings.min_average_books)
        .filter_map(|key| {
            let quotes: Vec<Decimal> = book.prices_for(&key).into_iter().map(|(_, p)| p).collect();
            mean(&quotes).map(|avg| (key, avg))
        })
        .collect();

    if prices.is_empty() {
        return None;
    }

    Some(Reference {
        source: ReferenceSource::MarketAverage {
            books: book.books.len(),
        },
        prices,
    })
}

/// Line an outcome belongs to, seen from the home side for spreads.
fn line_group(key: &OutcomeKey, market: MarketType, event: &Event) -> Option<Decimal> {
    match market {
        MarketType::H2h => None,
        MarketType::Totals => key.point,
        MarketType::Spreads => key.point.map(|p| {
            if key.name == event.home_team {
                p
            } else {
                -p
            }
        }),
    }
}

/// De-vig the reference per line group; single-sided groups are dropped.
fn fair_probabilities(
    reference: &Reference,
    market: MarketType,
    event: &Event,
) -> Result<BTreeMap<OutcomeKey, Fair>, DetectionError> {
    let mut groups: BTreeMap<Option<Decimal>, Vec<(&OutcomeKey, Decimal)>> = BTreeMap::new();
    for (key, price) in &reference.prices {
        groups
            .entry(line_group(key, market, event))
            .or_default()
            .push((key, *price));
    }

    let mut fair = BTreeMap::new();
    for (_, outcomes) in groups {
        if outcomes.len() < 2 {
            continue;
        }
        let raw = outcomes
            .iter()
            .map(|(_, price)| implied_probability(*price))
            .collect::<Result<Vec<_>, _>>()?;
        let probabilities = devig(&raw)?;

        for ((key, price), probability) in outcomes.into_iter().zip(probabilities) {
            fair.insert(
                key.clone(),
                Fair {
                    probability,
                    reference_price: price,
                },
            );
        }
    }

    Ok(fair)
}

/// `1 / (1 + cv)` of the quoted prices, clamped to `[0.3, 1]`.
fn agreement_score(book: &MarketBook, key: &OutcomeKey) -> Decimal {
    let prices: Vec<Decimal> = book.prices_for(key).into_iter().map(|(_, p)| p).collect();
    if prices.len() < 3 {
        return DEFAULT_AGREEMENT;
    }
    match coefficient_of_variation(&prices) {
        Some(cv) => (Decimal::ONE / (Decimal::ONE + cv)).clamp(MIN_AGREEMENT, Decimal::ONE),
        None => DEFAULT_AGREEMENT,
    }
}

fn threshold(settings: &ValueSettings, sharp: bool, agreement: Decimal, low_tier: bool) -> Decimal {
    let mut threshold = if sharp {
        settings.base_threshold_sharp
    } else {
        settings.base_threshold_average
    };
    if agreement < settings.agreement_floor {
        threshold += settings.disagreement_penalty;
    }
    if low_tier {
        threshold += settings.low_tier_penalty;
    }
    threshold.clamp(settings.min_threshold, settings.max_threshold)
}

fn confidence(
    settings: &ValueSettings,
    ev: Decimal,
    sharp: bool,
    agreement: Decimal,
    low_tier: bool,
) -> Decimal {
    let strength = (ev / settings.confidence_ev_scale).min(Decimal::ONE);
    let source = if sharp {
        Decimal::ONE
    } else {
        AVERAGE_SOURCE_FACTOR
    };
    let tier = if low_tier {
        LOW_TIER_FACTOR
    } else {
        Decimal::ONE
    };
    round_to(strength * source * agreement * tier, 3)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::odds::MockEventBuilder;
    use pretty_assertions::assert_eq;

    fn epl() -> Sport {
        Sport::new("soccer_epl", "Soccer", "EPL")
    }

    fn detect(event: &Event, sport: &Sport, markets: &[MarketType]) -> Vec<ValuebetRecord> {
        let mut run = RunState::new();
        ValuebetDetector::default()
            .detect(event, sport, markets, &mut run)
            .unwrap()
    }

    #[test]
    fn value_against_sharp_reference() {
        let event = MockEventBuilder::new("e1", "A", "B")
            .sport("soccer_epl", "EPL")
            .h2h("Pinnacle", &[("A", dec!(1.95)), ("B", dec!(1.95))])
            .h2h("Unibet", &[("A", dec!(2.20)), ("B", dec!(1.70))])
            .build();

        let records = detect(&event, &epl(), &[MarketType::H2h]);

        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.bookmaker, "Unibet");
        assert_eq!(record.outcome, "A");
        assert_eq!(record.fair_probability, dec!(0.5));
        assert_eq!(record.expected_value, dec!(10.00));
        // two quoting books => agreement 0.7 => threshold 3 % + 2 %
        assert_eq!(record.threshold, dec!(5.00));
        assert_eq!(record.confidence, dec!(0.28));
        assert_eq!(
            record.reference,
            ReferenceSource::Sharp {
                bookmaker: "Pinnacle".to_string()
            }
        );
        assert_eq!(record.header.dedup_key, "e1|Unibet|A|h2h");
        assert_eq!(record.link.as_deref(), Some("https://unibet.example.com/event"));
    }

    #[test]
    fn outlier_far_above_sharp_is_rejected() {
        // 2.70 is 35 % above the sharp 2.00
        let event = MockEventBuilder::new("e1", "A", "B")
            .h2h("Pinnacle", &[("A", dec!(2.00)), ("B", dec!(2.00))])
            .h2h("Unibet", &[("A", dec!(2.70)), ("B", dec!(1.50))])
            .build();

        assert!(detect(&event, &epl(), &[MarketType::H2h]).is_empty());
    }

    #[test]
    fn two_book_average_is_not_a_reference() {
        let event = MockEventBuilder::new("e1", "A", "B")
            .h2h("Unibet", &[("A", dec!(2.30)), ("B", dec!(1.70))])
            .h2h("Bwin", &[("A", dec!(1.80)), ("B", dec!(2.00))])
            .build();

        assert!(detect(&event, &epl(), &[MarketType::H2h]).is_empty());
    }

    #[test]
    fn value_against_market_average() {
        let event = MockEventBuilder::new("e1", "A", "B")
            .h2h("Bwin", &[("A", dec!(1.90)), ("B", dec!(1.90))])
            .h2h("Unibet", &[("A", dec!(1.90)), ("B", dec!(1.90))])
            .h2h("William Hill", &[("A", dec!(2.40)), ("B", dec!(1.70))])
            .build();

        let records = detect(&event, &epl(), &[MarketType::H2h]);

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].bookmaker, "William Hill");
        assert_eq!(records[0].reference, ReferenceSource::MarketAverage { books: 3 });
    }

    #[test]
    fn stale_high_ev_is_rejected() {
        let settings = ValueSettings {
            max_reference_ratio: dec!(10),
            ..ValueSettings::default()
        };
        let event = MockEventBuilder::new("e1", "A", "B")
            .h2h("Pinnacle", &[("A", dec!(2.00)), ("B", dec!(2.00))])
            .h2h("Unibet", &[("A", dec!(3.20)), ("B", dec!(1.20))])
            .build();
        let mut run = RunState::new();

        let records = ValuebetDetector::new(settings)
            .detect(&event, &epl(), &[MarketType::H2h], &mut run)
            .unwrap();

        assert!(records.is_empty());
    }

    #[test]
    fn low_tier_league_raises_threshold() {
        // EV 6 %: clears 5 % normally but not 7 % in a low-tier league
        let event = |key: &str, title: &str| {
            MockEventBuilder::new("e1", "A", "B")
                .sport(key, title)
                .h2h("Pinnacle", &[("A", dec!(2.00)), ("B", dec!(2.00))])
                .h2h("Unibet", &[("A", dec!(2.12)), ("B", dec!(1.80))])
                .build()
        };
        let youth = Sport::new("soccer_uefa_u21", "Soccer", "UEFA U21");

        let low_tier = detect(&event("soccer_uefa_u21", "UEFA U21"), &youth, &[MarketType::H2h]);
        let top_tier = detect(&event("soccer_epl", "EPL"), &epl(), &[MarketType::H2h]);

        assert!(low_tier.is_empty());
        assert_eq!(top_tier.len(), 1);
    }

    #[test]
    fn totals_are_devigged_per_point() {
        let event = MockEventBuilder::new("e1", "A", "B")
            .lines(
                "Pinnacle",
                MarketType::Totals,
                &[
                    ("Over", dec!(1.95), dec!(2.5)),
                    ("Under", dec!(1.95), dec!(2.5)),
                    ("Over", dec!(2.60), dec!(3.5)),
                ],
            )
            .lines(
                "Unibet",
                MarketType::Totals,
                &[("Over", dec!(2.20), dec!(2.5)), ("Over", dec!(3.00), dec!(3.5))],
            )
            .build();

        let records = detect(&event, &epl(), &[MarketType::Totals]);

        // 3.5 has a single-sided reference and cannot be de-vigged
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].outcome, "Over@2.5");
        assert_eq!(records[0].point, Some(dec!(2.5)));
    }

    #[test]
    fn fair_probabilities_sum_to_one_per_group() {
        let event = MockEventBuilder::new("e1", "A", "B").build();
        let reference = Reference {
            source: ReferenceSource::Sharp {
                bookmaker: "Pinnacle".to_string(),
            },
            prices: [
                (OutcomeKey::with_point("A", dec!(-1.5)), dec!(2.10)),
                (OutcomeKey::with_point("B", dec!(1.5)), dec!(1.80)),
                (OutcomeKey::with_point("A", dec!(1.5)), dec!(1.30)),
                (OutcomeKey::with_point("B", dec!(-1.5)), dec!(3.40)),
            ]
            .into_iter()
            .collect(),
        };

        let fair = fair_probabilities(&reference, MarketType::Spreads, &event).unwrap();

        let main_line = fair[&OutcomeKey::with_point("A", dec!(-1.5))].probability
            + fair[&OutcomeKey::with_point("B", dec!(1.5))].probability;
        let alt_line = fair[&OutcomeKey::with_point("A", dec!(1.5))].probability
            + fair[&OutcomeKey::with_point("B", dec!(-1.5))].probability;
        assert!((main_line - Decimal::ONE).abs() < dec!(0.000000001));
        assert!((alt_line - Decimal::ONE).abs() < dec!(0.000000001));
    }

    #[test]
    fn agreement_score_clamps() {
        let event = MockEventBuilder::new("e1", "A", "B")
            .h2h("X", &[("A", dec!(2.0))])
            .h2h("Y", &[("A", dec!(2.0))])
            .h2h("Z", &[("A", dec!(2.0))])
            .build();
        let book = extract(
            &event.bookmakers,
            MarketType::H2h,
            &event,
            &mut crate::pricing::ExactMatcher,
        );

        assert_eq!(agreement_score(&book, &OutcomeKey::named("A")), Decimal::ONE);
        assert_eq!(agreement_score(&book, &OutcomeKey::named("B")), DEFAULT_AGREEMENT);
    }

    #[test]
    fn threshold_is_clamped() {
        let settings = ValueSettings::default();
        assert_eq!(threshold(&settings, true, dec!(1), false), dec!(0.03));
        assert_eq!(threshold(&settings, false, dec!(0.5), true), dec!(0.10));
        let strict = ValueSettings {
            base_threshold_average: dec!(0.20),
            ..ValueSettings::default()
        };
        assert_eq!(threshold(&strict, false, dec!(1), false), dec!(0.12));
    }

    #[test]
    fn duplicate_valuebet_reported_once_per_pass() {
        let event = MockEventBuilder::new("e1", "A", "B")
            .h2h("Pinnacle", &[("A", dec!(1.95)), ("B", dec!(1.95))])
            .h2h("Unibet", &[("A", dec!(2.20)), ("B", dec!(1.70))])
            .build();
        let detector = ValuebetDetector::default();
        let mut run = RunState::new();

        let first = detector.detect(&event, &epl(), &[MarketType::H2h], &mut run).unwrap();
        let second = detector.detect(&event, &epl(), &[MarketType::H2h], &mut run).unwrap();

        assert_eq!(first.len(), 1);
        assert!(second.is_empty());
    }

    #[test]
    fn detection_is_idempotent_across_fresh_runs() {
        let event = MockEventBuilder::new("e1", "A", "B")
            .h2h("Bwin", &[("A", dec!(1.90)), ("B", dec!(1.90))])
            .h2h("Unibet", &[("A", dec!(1.90)), ("B", dec!(1.90))])
            .h2h("William Hill", &[("A", dec!(2.40)), ("B", dec!(1.70))])
            .build();

        let first = detect(&event, &epl(), &[MarketType::H2h]);
        let second = detect(&event, &epl(), &[MarketType::H2h]);

        assert_eq!(first.len(), 1);
        assert_eq!(first.len(), second.len());
        assert_eq!(first[0].expected_value, second[0].expected_value);
        assert_eq!(first[0].threshold, second[0].threshold);
        assert_eq!(first[0].header.dedup_key, second[0].header.dedup_key);
    }

    #[test]
    fn absurd_price_does_not_abort_event() {
        let event = MockEventBuilder::new("e1", "A", "B")
            .h2h("Bwin", &[("A", dec!(1.90)), ("B", dec!(1.90))])
            .h2h("Unibet", &[("A", dec!(1.90)), ("B", dec!(1.90))])
            .h2h("William Hill", &[("A", dec!(2.40)), ("B", dec!(1.70))])
            .h2h("Junk", &[("A", dec!(1000000000000000)), ("B", dec!(1.90))])
            .build();
        let mut run = RunState::new();

        let records = ValuebetDetector::default()
            .detect(&event, &epl(), &[MarketType::H2h], &mut run)
            .unwrap();

        assert!(records.iter().all(|r| r.bookmaker != "Junk"));
    }
}
