//! Typed detector settings.

use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::error::ConfigError;
use crate::odds::MarketType;

/// Default low-tier keywords compiled once.
static DEFAULT_LOW_TIER: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new("(?i)reserve|u19|u21|u23|friendly|youth|amateur").ok());

/// Settings for every detector.
#[derive(Debug, Clone)]
pub struct DetectionSettings {
    /// Markets analysed.
    pub markets: Vec<MarketType>,
    /// Surebet settings.
    pub surebet: SurebetSettings,
    /// Middle settings.
    pub middle: MiddleSettings,
    /// Valuebet settings.
    pub value: ValueSettings,
}

impl Default for DetectionSettings {
    fn default() -> Self {
        Self {
            markets: MarketType::ALL.to_vec(),
            surebet: SurebetSettings::default(),
            middle: MiddleSettings::default(),
            value: ValueSettings::default(),
        }
    }
}

/// Surebet settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SurebetSettings {
    /// Minimum profit margin in percent.
    pub min_profit_margin: Decimal,
    /// Maximum |home + away| between spread legs.
    pub spread_tolerance: Decimal,
}

impl Default for SurebetSettings {
    fn default() -> Self {
        Self {
            min_profit_margin: dec!(1.0),
            spread_tolerance: dec!(0.5),
        }
    }
}

/// Maximum middle window per sport group, matched by keyword.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowTable {
    entries: Vec<(Vec<String>, Decimal)>,
    default: Decimal,
}

impl WindowTable {
    /// Ordered keyword entries plus a fallback.
    pub fn new(entries: Vec<(Vec<String>, Decimal)>, default: Decimal) -> Self {
        let entries = entries
            .into_iter()
            .map(|(keywords, window)| {
                (
                    keywords.into_iter().map(|k| k.to_lowercase()).collect(),
                    window,
                )
            })
            .collect();
        Self { entries, default }
    }

    /// First entry whose keyword occurs in the lower-cased group.
    pub fn max_window(&self, sport_group: &str) -> Decimal {
        let group = sport_group.to_lowercase();
        self.entries
            .iter()
            .find(|(keywords, _)| keywords.iter().any(|k| group.contains(k.as_str())))
            .map(|(_, window)| *window)
            .unwrap_or(self.default)
    }
}

impl Default for WindowTable {
    fn default() -> Self {
        Self::new(
            vec![
                (vec!["basketball".to_string()], dec!(2.0)),
                (vec!["football".to_string(), "nfl".to_string()], dec!(3.0)),
                (vec!["soccer".to_string()], dec!(1.0)),
            ],
            dec!(2.5),
        )
    }
}

/// Middle settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MiddleSettings {
    /// Window table.
    pub windows: WindowTable,
    /// Minimum confidence.
    pub min_confidence: Decimal,
}

impl Default for MiddleSettings {
    fn default() -> Self {
        Self {
            windows: WindowTable::default(),
            min_confidence: dec!(0.5),
        }
    }
}

/// Low-tier league heuristic.
#[derive(Debug, Clone)]
pub struct LeagueTier {
    pattern: Option<Regex>,
}

impl LeagueTier {
    /// Compile keywords into one case-insensitive matcher.
    pub fn new<S: AsRef<str>>(keywords: &[S]) -> Result<Self, ConfigError> {
        let alternatives: Vec<String> = keywords
            .iter()
            .map(|k| k.as_ref().trim())
            .filter(|k| !k.is_empty())
            .map(regex::escape)
            .collect();

        if alternatives.is_empty() {
            return Ok(Self { pattern: None });
        }

        let pattern = RegexBuilder::new(&alternatives.join("|"))
            .case_insensitive(true)
            .build()
            .map_err(|e| ConfigError::InvalidPattern(e.to_string()))?;

        Ok(Self {
            pattern: Some(pattern),
        })
    }

    /// Whether any of the sport labels carries a low-tier keyword.
    pub fn is_low_tier(&self, sport_key: &str, sport_title: &str, sport_group: &str) -> bool {
        self.pattern.as_ref().is_some_and(|re| {
            [sport_key, sport_title, sport_group]
                .iter()
                .any(|label| re.is_match(label))
        })
    }
}

impl Default for LeagueTier {
    fn default() -> Self {
        Self {
            pattern: DEFAULT_LOW_TIER.clone(),
        }
    }
}

/// Valuebet settings.
#[derive(Debug, Clone)]
pub struct ValueSettings {
    /// Lower-cased sharp bookmaker names, in priority order.
    pub sharp_books: Vec<String>,
    /// Minimum books quoting an outcome for the market average.
    pub min_average_books: usize,
    /// Low-tier league heuristic.
    pub tier: LeagueTier,
    /// Base EV threshold with a sharp reference.
    pub base_threshold_sharp: Decimal,
    /// Base EV threshold with the market average.
    pub base_threshold_average: Decimal,
    /// Added when books disagree.
    pub disagreement_penalty: Decimal,
    /// Added for low-tier leagues.
    pub low_tier_penalty: Decimal,
    /// Agreement below this counts as disagreement.
    pub agreement_floor: Decimal,
    /// Threshold clamp.
    pub min_threshold: Decimal,
    /// Threshold clamp.
    pub max_threshold: Decimal,
    /// Implausible odds cap.
    pub max_odds: Decimal,
    /// Stale-data EV cap.
    pub max_ev: Decimal,
    /// Outlier cap relative to the reference price.
    pub max_reference_ratio: Decimal,
    /// EV at which confidence saturates.
    pub confidence_ev_scale: Decimal,
}

impl Default for ValueSettings {
    fn default() -> Self {
        Self {
            sharp_books: ["betfair", "pinnacle", "sbobet", "matchbook", "betcris"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            min_average_books: 3,
            tier: LeagueTier::default(),
            base_threshold_sharp: dec!(0.03),
            base_threshold_average: dec!(0.06),
            disagreement_penalty: dec!(0.02),
            low_tier_penalty: dec!(0.02),
            agreement_floor: dec!(0.75),
            min_threshold: dec!(0.02),
            max_threshold: dec!(0.12),
            max_odds: dec!(20),
            max_ev: dec!(0.50),
            max_reference_ratio: dec!(1.25),
            confidence_ev_scale: dec!(0.25),
        }
    }
}

impl ValueSettings {
    /// Whether a bookmaker title or key names a sharp book.
    pub fn is_sharp(&self, title: &str, key: &str) -> bool {
        self.sharp_rank(title, key).is_some()
    }

    /// Position of the bookmaker in the sharp allow-list.
    pub fn sharp_rank(&self, title: &str, key: &str) -> Option<usize> {
        let title = title.to_lowercase();
        let key = key.to_lowercase();
        self.sharp_books
            .iter()
            .position(|sharp| title.contains(sharp.as_str()) || key.contains(sharp.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_table_matches_keywords_in_order() {
        let table = WindowTable::default();
        assert_eq!(table.max_window("Basketball"), dec!(2.0));
        assert_eq!(table.max_window("American Football"), dec!(3.0));
        assert_eq!(table.max_window("NFL Preseason"), dec!(3.0));
        assert_eq!(table.max_window("Soccer"), dec!(1.0));
        assert_eq!(table.max_window("Ice Hockey"), dec!(2.5));
    }

    #[test]
    fn league_tier_matches_any_label() {
        let tier = LeagueTier::default();
        assert!(tier.is_low_tier("soccer_england_u21", "Premier League 2", "Soccer"));
        assert!(tier.is_low_tier("soccer_friendlies", "Club Friendly", "Soccer"));
        assert!(!tier.is_low_tier("soccer_epl", "EPL", "Soccer"));
    }

    #[test]
    fn league_tier_escapes_keywords() {
        let tier = LeagueTier::new(&["b.team"]).unwrap();
        assert!(tier.is_low_tier("x", "B.Team Cup", "y"));
        assert!(!tier.is_low_tier("x", "BxTeam Cup", "y"));
    }

    #[test]
    fn empty_league_tier_never_matches() {
        let tier = LeagueTier::new::<&str>(&[]).unwrap();
        assert!(!tier.is_low_tier("reserve", "reserve", "reserve"));
    }

    #[test]
    fn sharp_books_match_title_or_key() {
        let settings = ValueSettings::default();
        assert!(settings.is_sharp("Pinnacle", "pinnacle"));
        assert!(settings.is_sharp("Betfair Exchange", "betfair_ex_eu"));
        assert!(!settings.is_sharp("Unibet", "unibet_eu"));
        assert_eq!(settings.sharp_rank("Betcris", "x"), Some(4));
    }
}
