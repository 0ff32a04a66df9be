//! Opportunity records produced by the detectors.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::odds::{Event, MarketType, Sport};
use crate::pricing::probability::round_pct;

/// Opportunity category, also the sink key.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Display,
    EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Category {
    /// Risk-free arbitrage.
    Surebets,
    /// Two-sided line windows.
    Middles,
    /// Prices above the fair reference.
    Valuebets,
}

impl Category {
    /// Every category.
    pub const ALL: [Category; 3] = [Category::Surebets, Category::Middles, Category::Valuebets];
}

/// Fields shared by every record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpportunityHeader {
    /// Unique record id.
    pub id: Uuid,
    /// Fixture description ("Home vs Away").
    pub event: String,
    /// Feed event id.
    pub event_id: String,
    /// Sport key.
    pub sport_key: String,
    /// Sport group.
    pub sport_group: String,
    /// League title.
    pub sport_title: String,
    /// Market analysed.
    pub market: MarketType,
    /// Scheduled start.
    #[serde(with = "time::serde::rfc3339")]
    pub commence_time: OffsetDateTime,
    /// Identity of the real-world bet within a pass.
    pub dedup_key: String,
    /// When the record was produced.
    #[serde(with = "time::serde::rfc3339")]
    pub detected_at: OffsetDateTime,
}

impl OpportunityHeader {
    /// Header for a record found on `event`.
    pub fn new(event: &Event, sport: &Sport, market: MarketType, dedup_key: String) -> Self {
        let sport_title = if event.sport_title.is_empty() {
            sport.title.clone()
        } else {
            event.sport_title.clone()
        };

        Self {
            id: Uuid::new_v4(),
            event: event.description(),
            event_id: event.id.clone(),
            sport_key: event.sport_key.clone(),
            sport_group: sport.group.clone(),
            sport_title,
            market,
            commence_time: event.commence_time,
            dedup_key,
            detected_at: OffsetDateTime::now_utc(),
        }
    }
}

/// Lines of a surebet on a spreads or totals market.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SurebetPoints {
    /// Both legs on the same total.
    Total {
        /// Total line.
        point: Decimal,
    },
    /// Home and away handicaps.
    Spread {
        /// Home handicap.
        home: Decimal,
        /// Away handicap.
        away: Decimal,
    },
}

/// Risk-free arbitrage across bookmakers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SurebetRecord {
    /// Shared fields.
    #[serde(flatten)]
    pub header: OpportunityHeader,
    /// Guaranteed return in percent.
    pub profit_margin: Decimal,
    /// Combined implied probability of the legs.
    pub implied_probability: Decimal,
    /// Outcome -> best price.
    pub best_odds: BTreeMap<String, Decimal>,
    /// Outcome -> bookmaker offering the best price.
    pub bookmakers: BTreeMap<String, String>,
    /// Bookmaker -> deep link.
    pub links: BTreeMap<String, String>,
    /// Lines for spreads/totals.
    pub points: Option<SurebetPoints>,
}

impl SurebetRecord {
    /// Split a bankroll so every outcome pays the same amount.
    pub fn stakes(&self, bankroll: Decimal) -> BTreeMap<String, Decimal> {
        if self.implied_probability <= Decimal::ZERO {
            return BTreeMap::new();
        }
        self.best_odds
            .iter()
            .map(|(outcome, price)| {
                let stake = bankroll / price / self.implied_probability;
                (outcome.clone(), round_pct(stake))
            })
            .collect()
    }

    /// Payout of any outcome when the bankroll is split by [`Self::stakes`].
    pub fn guaranteed_payout(&self, bankroll: Decimal) -> Decimal {
        if self.implied_probability <= Decimal::ZERO {
            return Decimal::ZERO;
        }
        round_pct(bankroll / self.implied_probability)
    }
}

/// Two bookmakers' lines leaving a window where both bets win.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MiddleRecord {
    /// Shared fields.
    #[serde(flatten)]
    pub header: OpportunityHeader,
    /// Bookmakers of the first (home/over) and second (away/under) leg.
    pub bookmakers: (String, String),
    /// First leg line as quoted.
    pub first_line: Decimal,
    /// Second leg line as quoted.
    pub second_line: Decimal,
    /// First leg price.
    pub first_price: Decimal,
    /// Second leg price.
    pub second_price: Decimal,
    /// Width of the winning window.
    pub window: Decimal,
    /// Expected value in percent.
    pub expected_value: Decimal,
    /// 0..1, narrower windows score higher.
    pub confidence: Decimal,
    /// Bookmaker -> deep link.
    pub links: BTreeMap<String, String>,
}

/// Where the fair price of a valuebet came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReferenceSource {
    /// A sharp bookmaker's prices.
    Sharp {
        /// Sharp bookmaker title.
        bookmaker: String,
    },
    /// The average over several bookmakers.
    MarketAverage {
        /// Bookmakers quoting the market.
        books: usize,
    },
}

impl ReferenceSource {
    /// Whether the reference is a sharp bookmaker.
    pub fn is_sharp(&self) -> bool {
        matches!(self, ReferenceSource::Sharp { .. })
    }
}

/// A price above the de-vigged fair price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValuebetRecord {
    /// Shared fields.
    #[serde(flatten)]
    pub header: OpportunityHeader,
    /// Bookmaker offering the price.
    pub bookmaker: String,
    /// Outcome, including the line when present.
    pub outcome: String,
    /// Line for spreads/totals.
    pub point: Option<Decimal>,
    /// Offered price.
    pub odds: Decimal,
    /// Reference price for the same outcome.
    pub reference_odds: Decimal,
    /// De-vigged reference probability.
    pub fair_probability: Decimal,
    /// Expected value in percent.
    pub expected_value: Decimal,
    /// Threshold the EV cleared, in percent.
    pub threshold: Decimal,
    /// 0..1 confidence score.
    pub confidence: Decimal,
    /// Reference used.
    pub reference: ReferenceSource,
    /// Deep link.
    pub link: Option<String>,
}

/// Any detected opportunity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Opportunity {
    /// Surebet.
    Surebet(SurebetRecord),
    /// Middle.
    Middle(MiddleRecord),
    /// Valuebet.
    Valuebet(ValuebetRecord),
}

impl Opportunity {
    /// Shared fields.
    pub fn header(&self) -> &OpportunityHeader {
        match self {
            Opportunity::Surebet(r) => &r.header,
            Opportunity::Middle(r) => &r.header,
            Opportunity::Valuebet(r) => &r.header,
        }
    }

    /// Unique record id.
    pub fn id(&self) -> Uuid {
        self.header().id
    }

    /// Category the record belongs to.
    pub fn category(&self) -> Category {
        match self {
            Opportunity::Surebet(_) => Category::Surebets,
            Opportunity::Middle(_) => Category::Middles,
            Opportunity::Valuebet(_) => Category::Valuebets,
        }
    }
}

impl From<SurebetRecord> for Opportunity {
    fn from(record: SurebetRecord) -> Self {
        Opportunity::Surebet(record)
    }
}

impl From<MiddleRecord> for Opportunity {
    fn from(record: MiddleRecord) -> Self {
        Opportunity::Middle(record)
    }
}

impl From<ValuebetRecord> for Opportunity {
    fn from(record: ValuebetRecord) -> Self {
        Opportunity::Valuebet(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::odds::MockEventBuilder;
    use rust_decimal_macros::dec;
    use std::str::FromStr;

    fn header() -> OpportunityHeader {
        let event = MockEventBuilder::new("e1", "Boston Celtics", "New York Knicks").build();
        let sport = Sport::new("basketball_nba", "Basketball", "NBA");
        OpportunityHeader::new(&event, &sport, MarketType::H2h, "k".to_string())
    }

    fn surebet() -> SurebetRecord {
        SurebetRecord {
            header: header(),
            profit_margin: dec!(3.73),
            implied_probability: dec!(1) / dec!(2.10) + dec!(1) / dec!(2.05),
            best_odds: [
                ("Boston Celtics".to_string(), dec!(2.10)),
                ("New York Knicks".to_string(), dec!(2.05)),
            ]
            .into_iter()
            .collect(),
            bookmakers: BTreeMap::new(),
            links: BTreeMap::new(),
            points: None,
        }
    }

    #[test]
    fn category_names() {
        assert_eq!(Category::Surebets.to_string(), "surebets");
        assert_eq!(Category::from_str("Middles").unwrap(), Category::Middles);
        assert!(Category::from_str("arbs").is_err());
    }

    #[test]
    fn header_describes_event() {
        let header = header();
        assert_eq!(header.event, "Boston Celtics vs New York Knicks");
        assert_eq!(header.sport_group, "Basketball");
        assert_eq!(header.sport_title, "NBA");
    }

    #[test]
    fn stakes_equalise_payout() {
        let record = surebet();
        let stakes = record.stakes(dec!(100));

        assert_eq!(stakes["Boston Celtics"], dec!(49.40));
        assert_eq!(stakes["New York Knicks"], dec!(50.60));
        assert_eq!(record.guaranteed_payout(dec!(100)), dec!(103.73));
    }

    #[test]
    fn opportunity_serializes_with_type_tag() {
        let opportunity = Opportunity::from(surebet());
        let json = serde_json::to_value(&opportunity).unwrap();

        assert_eq!(json["type"], "surebet");
        assert_eq!(json["event"], "Boston Celtics vs New York Knicks");
        assert_eq!(json["market"], "h2h");

        let back: Opportunity = serde_json::from_value(json).unwrap();
        assert_eq!(back.category(), Category::Surebets);
        assert_eq!(back.id(), opportunity.id());
    }
}
