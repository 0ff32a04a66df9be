//! Odds snapshot types as delivered by the odds feed.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use time::OffsetDateTime;

/// Market type analysed by the detectors.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Display,
    EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(ascii_case_insensitive)]
pub enum MarketType {
    /// Head-to-head (moneyline / 1X2).
    #[strum(serialize = "h2h")]
    H2h,
    /// Point spread / handicap.
    #[strum(serialize = "spreads")]
    Spreads,
    /// Over/under totals.
    #[strum(serialize = "totals")]
    Totals,
}

impl MarketType {
    /// All supported market types.
    pub const ALL: [MarketType; 3] = [MarketType::H2h, MarketType::Spreads, MarketType::Totals];

    /// Whether outcomes of this market carry a point/line value.
    pub fn has_points(&self) -> bool {
        matches!(self, MarketType::Spreads | MarketType::Totals)
    }
}

/// In-season sport as listed by the feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sport {
    /// Sport key (e.g., "basketball_nba").
    pub key: String,
    /// Sport group (e.g., "Basketball").
    pub group: String,
    /// League title (e.g., "NBA").
    pub title: String,
    /// Whether the sport is in season.
    #[serde(default = "default_true")]
    pub active: bool,
    /// Whether only outright (futures) markets exist.
    #[serde(default)]
    pub has_outrights: bool,
}

fn default_true() -> bool {
    true
}

impl Sport {
    /// Create an active, non-outright sport.
    pub fn new(key: impl Into<String>, group: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            group: group.into(),
            title: title.into(),
            active: true,
            has_outrights: false,
        }
    }
}

/// One sporting fixture with every bookmaker's quotes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Feed event id.
    pub id: String,
    /// Sport key the event belongs to.
    pub sport_key: String,
    /// League title.
    #[serde(default)]
    pub sport_title: String,
    /// Scheduled start.
    #[serde(with = "time::serde::rfc3339")]
    pub commence_time: OffsetDateTime,
    /// Home team name.
    pub home_team: String,
    /// Away team name.
    pub away_team: String,
    /// Per-bookmaker quotes.
    #[serde(default)]
    pub bookmakers: Vec<BookmakerQuote>,
}

impl Event {
    /// Human-readable fixture description ("Home vs Away").
    pub fn description(&self) -> String {
        format!("{} vs {}", self.home_team, self.away_team)
    }

    /// Whether any bookmaker quoted this event.
    pub fn has_quotes(&self) -> bool {
        !self.bookmakers.is_empty()
    }
}

/// One bookmaker's markets for an event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookmakerQuote {
    /// Bookmaker key (e.g., "pinnacle").
    pub key: String,
    /// Display name (e.g., "Pinnacle").
    pub title: String,
    /// Deep-link template for the event page.
    #[serde(default)]
    pub link: Option<String>,
    /// Quoted markets.
    #[serde(default)]
    pub markets: Vec<Market>,
}

/// One market of a bookmaker quote.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Market {
    /// Market key ("h2h", "spreads", "totals", "h2h_lay", ...).
    pub key: String,
    /// Deep link to the market.
    #[serde(default)]
    pub link: Option<String>,
    /// Quoted outcomes.
    #[serde(default)]
    pub outcomes: Vec<Outcome>,
}

impl Market {
    /// Parsed market type, `None` for markets the scanner does not analyse.
    pub fn market_type(&self) -> Option<MarketType> {
        self.key.parse().ok()
    }
}

/// One priced outcome. Name and price may be missing in malformed feed rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Outcome {
    /// Participant or side name.
    #[serde(default)]
    pub name: Option<String>,
    /// Decimal price.
    #[serde(default)]
    pub price: Option<Decimal>,
    /// Line value for spreads/totals.
    #[serde(default)]
    pub point: Option<Decimal>,
    /// Deep link to the selection.
    #[serde(default)]
    pub link: Option<String>,
}

impl Outcome {
    /// Create a priced outcome without a line.
    pub fn new(name: impl Into<String>, price: Decimal) -> Self {
        Self {
            name: Some(name.into()),
            price: Some(price),
            point: None,
            link: None,
        }
    }

    /// Create a priced outcome with a line.
    pub fn with_point(name: impl Into<String>, price: Decimal, point: Decimal) -> Self {
        Self {
            point: Some(point),
            ..Self::new(name, price)
        }
    }
}
