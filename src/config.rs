//! Application configuration loaded from environment variables.

use std::path::PathBuf;

use rust_decimal::Decimal;
use serde::Deserialize;

use crate::detector::settings::{
    DetectionSettings, LeagueTier, MiddleSettings, SurebetSettings, ValueSettings, WindowTable,
};
use crate::error::ConfigError;
use crate::odds::MarketType;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    // === Odds Source ===
    /// The Odds API key. Optional when an offline snapshot is used.
    #[serde(default)]
    pub odds_api_key: Option<String>,

    /// The Odds API base URL.
    #[serde(default = "default_odds_api_url")]
    pub odds_api_url: String,

    /// Bookmaker regions requested from the API.
    #[serde(default = "default_regions")]
    pub odds_regions: Vec<String>,

    /// Offline snapshot file (`{sports, odds}` JSON).
    #[serde(default)]
    pub odds_file: Option<PathBuf>,

    /// Markets analysed (h2h, spreads, totals).
    #[serde(default = "default_markets")]
    pub markets: Vec<String>,

    /// Optional sport-key allow-list; empty means every in-season sport.
    #[serde(default)]
    pub sports: Vec<String>,

    /// HTTP timeout in milliseconds.
    #[serde(default = "default_http_timeout")]
    pub http_timeout_ms: u64,

    // === Surebets ===
    /// Minimum surebet profit margin in percent.
    #[serde(default = "default_min_profit_margin")]
    pub min_profit_margin: Decimal,

    /// Maximum |home + away| between the two legs of a spread surebet.
    #[serde(default = "default_spread_tolerance")]
    pub spread_tolerance: Decimal,

    // === Middles ===
    /// Maximum middle window for basketball.
    #[serde(default = "default_window_basketball")]
    pub middle_window_basketball: Decimal,

    /// Maximum middle window for american football.
    #[serde(default = "default_window_football")]
    pub middle_window_football: Decimal,

    /// Maximum middle window for soccer.
    #[serde(default = "default_window_soccer")]
    pub middle_window_soccer: Decimal,

    /// Maximum middle window for every other sport.
    #[serde(default = "default_window_default")]
    pub middle_window_default: Decimal,

    /// Minimum middle confidence.
    #[serde(default = "default_middle_min_confidence")]
    pub middle_min_confidence: Decimal,

    // === Valuebets ===
    /// Sharp bookmaker allow-list, in priority order.
    #[serde(default = "default_sharp_books")]
    pub sharp_books: Vec<String>,

    /// Keywords marking a low-tier league.
    #[serde(default = "default_low_tier_keywords")]
    pub low_tier_keywords: Vec<String>,

    /// Base EV threshold when a sharp book is the reference.
    #[serde(default = "default_threshold_sharp")]
    pub value_base_threshold_sharp: Decimal,

    /// Base EV threshold when the market average is the reference.
    #[serde(default = "default_threshold_average")]
    pub value_base_threshold_average: Decimal,

    /// Odds above this are treated as implausible.
    #[serde(default = "default_max_odds")]
    pub value_max_odds: Decimal,

    /// EV above this is treated as stale data.
    #[serde(default = "default_max_ev")]
    pub value_max_ev: Decimal,

    /// Maximum ratio of a price to its reference price.
    #[serde(default = "default_max_reference_ratio")]
    pub value_max_reference_ratio: Decimal,

    // === Scheduling & Output ===
    /// Freshness window of persisted results, in seconds.
    #[serde(default = "default_result_ttl")]
    pub result_ttl_secs: u64,

    /// Seconds between scan passes.
    #[serde(default = "default_scan_interval")]
    pub scan_interval_secs: u64,

    /// Directory for JSON snapshots; results stay in memory when unset.
    #[serde(default)]
    pub output_dir: Option<PathBuf>,

    // === Server Configuration ===
    /// HTTP server port for the API and metrics endpoints.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub rust_log: String,

    /// Emit JSON log lines.
    #[serde(default)]
    pub log_json: bool,
}

fn default_odds_api_url() -> String {
    "https://api.the-odds-api.com/v4".to_string()
}

fn default_regions() -> Vec<String> {
    vec!["uk".to_string(), "eu".to_string(), "us".to_string()]
}

fn default_markets() -> Vec<String> {
    MarketType::ALL.iter().map(|m| m.to_string()).collect()
}

fn default_http_timeout() -> u64 {
    10_000
}

fn default_min_profit_margin() -> Decimal {
    Decimal::ONE // 1.0 %
}

fn default_spread_tolerance() -> Decimal {
    Decimal::new(5, 1) // 0.5
}

fn default_window_basketball() -> Decimal {
    Decimal::new(2, 0)
}

fn default_window_football() -> Decimal {
    Decimal::new(3, 0)
}

fn default_window_soccer() -> Decimal {
    Decimal::ONE
}

fn default_window_default() -> Decimal {
    Decimal::new(25, 1) // 2.5
}

fn default_middle_min_confidence() -> Decimal {
    Decimal::new(5, 1) // 0.5
}

fn default_sharp_books() -> Vec<String> {
    ["betfair", "pinnacle", "sbobet", "matchbook", "betcris"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_low_tier_keywords() -> Vec<String> {
    ["reserve", "u19", "u21", "u23", "friendly", "youth", "amateur"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_threshold_sharp() -> Decimal {
    Decimal::new(3, 2) // 0.03
}

fn default_threshold_average() -> Decimal {
    Decimal::new(6, 2) // 0.06
}

fn default_max_odds() -> Decimal {
    Decimal::new(20, 0)
}

fn default_max_ev() -> Decimal {
    Decimal::new(5, 1) // 0.50
}

fn default_max_reference_ratio() -> Decimal {
    Decimal::new(125, 2) // 1.25
}

fn default_result_ttl() -> u64 {
    3600
}

fn default_scan_interval() -> u64 {
    300
}

fn default_port() -> u16 {
    8080
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            odds_api_key: None,
            odds_api_url: default_odds_api_url(),
            odds_regions: default_regions(),
            odds_file: None,
            markets: default_markets(),
            sports: Vec::new(),
            http_timeout_ms: default_http_timeout(),
            min_profit_margin: default_min_profit_margin(),
            spread_tolerance: default_spread_tolerance(),
            middle_window_basketball: default_window_basketball(),
            middle_window_football: default_window_football(),
            middle_window_soccer: default_window_soccer(),
            middle_window_default: default_window_default(),
            middle_min_confidence: default_middle_min_confidence(),
            sharp_books: default_sharp_books(),
            low_tier_keywords: default_low_tier_keywords(),
            value_base_threshold_sharp: default_threshold_sharp(),
            value_base_threshold_average: default_threshold_average(),
            value_max_odds: default_max_odds(),
            value_max_ev: default_max_ev(),
            value_max_reference_ratio: default_max_reference_ratio(),
            result_ttl_secs: default_result_ttl(),
            scan_interval_secs: default_scan_interval(),
            output_dir: None,
            port: default_port(),
            rust_log: default_log_level(),
            log_json: false,
        }
    }
}

impl Config {
    /// Load configuration from environment, reading .env file first.
    pub fn load() -> Result<Self, envy::Error> {
        dotenvy::dotenv().ok();
        envy::from_env()
    }

    /// Check if the configuration is valid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.parsed_markets()?;

        if self.min_profit_margin < Decimal::ZERO {
            return Err(invalid("MIN_PROFIT_MARGIN", "must not be negative"));
        }

        if self.spread_tolerance < Decimal::ZERO {
            return Err(invalid("SPREAD_TOLERANCE", "must not be negative"));
        }

        for (field, window) in [
            ("MIDDLE_WINDOW_BASKETBALL", self.middle_window_basketball),
            ("MIDDLE_WINDOW_FOOTBALL", self.middle_window_football),
            ("MIDDLE_WINDOW_SOCCER", self.middle_window_soccer),
            ("MIDDLE_WINDOW_DEFAULT", self.middle_window_default),
        ] {
            if window <= Decimal::ZERO {
                return Err(invalid(field, "must be greater than 0"));
            }
        }

        if self.middle_min_confidence < Decimal::ZERO || self.middle_min_confidence > Decimal::ONE
        {
            return Err(invalid("MIDDLE_MIN_CONFIDENCE", "must be between 0 and 1"));
        }

        if self.value_max_odds <= Decimal::ONE {
            return Err(invalid("VALUE_MAX_ODDS", "must be greater than 1"));
        }

        if self.value_max_ev <= Decimal::ZERO {
            return Err(invalid("VALUE_MAX_EV", "must be greater than 0"));
        }

        if self.value_max_reference_ratio < Decimal::ONE {
            return Err(invalid("VALUE_MAX_REFERENCE_RATIO", "must be at least 1"));
        }

        if self.result_ttl_secs == 0 {
            return Err(invalid("RESULT_TTL_SECS", "must be greater than 0"));
        }

        if self.scan_interval_secs == 0 {
            return Err(invalid("SCAN_INTERVAL_SECS", "must be greater than 0"));
        }

        Ok(())
    }

    /// Parse the configured market names.
    pub fn parsed_markets(&self) -> Result<Vec<MarketType>, ConfigError> {
        let mut markets = Vec::with_capacity(self.markets.len());
        for raw in &self.markets {
            let name = raw.trim();
            if name.is_empty() {
                continue;
            }
            let market = name
                .parse::<MarketType>()
                .map_err(|_| ConfigError::InvalidMarket(name.to_string()))?;
            if !markets.contains(&market) {
                markets.push(market);
            }
        }

        if markets.is_empty() {
            return Err(invalid("MARKETS", "at least one market is required"));
        }
        Ok(markets)
    }

    /// Build the typed detector settings.
    pub fn settings(&self) -> Result<DetectionSettings, ConfigError> {
        self.validate()?;

        let windows = WindowTable::new(
            vec![
                (vec!["basketball".to_string()], self.middle_window_basketball),
                (
                    vec!["football".to_string(), "nfl".to_string()],
                    self.middle_window_football,
                ),
                (vec!["soccer".to_string()], self.middle_window_soccer),
            ],
            self.middle_window_default,
        );

        Ok(DetectionSettings {
            markets: self.parsed_markets()?,
            surebet: SurebetSettings {
                min_profit_margin: self.min_profit_margin,
                spread_tolerance: self.spread_tolerance,
            },
            middle: MiddleSettings {
                windows,
                min_confidence: self.middle_min_confidence,
            },
            value: ValueSettings {
                sharp_books: self
                    .sharp_books
                    .iter()
                    .map(|b| b.trim().to_lowercase())
                    .filter(|b| !b.is_empty())
                    .collect(),
                tier: LeagueTier::new(&self.low_tier_keywords)?,
                base_threshold_sharp: self.value_base_threshold_sharp,
                base_threshold_average: self.value_base_threshold_average,
                max_odds: self.value_max_odds,
                max_ev: self.value_max_ev,
                max_reference_ratio: self.value_max_reference_ratio,
                ..ValueSettings::default()
            },
        })
    }

    /// Whether live API access is configured.
    pub fn has_api_key(&self) -> bool {
        self.odds_api_key
            .as_deref()
            .is_some_and(|key| !key.trim().is_empty())
    }
}

fn invalid(field: &'static str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        field,
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn default_values_are_sensible() {
        assert_eq!(default_min_profit_margin(), dec!(1.0));
        assert_eq!(default_window_default(), dec!(2.5));
        assert_eq!(default_max_reference_ratio(), dec!(1.25));
        assert_eq!(default_result_ttl(), 3600);
        assert_eq!(default_markets(), vec!["h2h", "spreads", "totals"]);
    }

    #[test]
    fn default_config_validates() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn parsed_markets_rejects_unknown_market() {
        let config = Config {
            markets: vec!["h2h".to_string(), "outrights".to_string()],
            ..Config::default()
        };

        assert_eq!(
            config.parsed_markets(),
            Err(ConfigError::InvalidMarket("outrights".to_string()))
        );
    }

    #[test]
    fn parsed_markets_dedups_and_ignores_case() {
        let config = Config {
            markets: vec!["Totals".to_string(), " totals".to_string(), "H2H".to_string()],
            ..Config::default()
        };

        assert_eq!(
            config.parsed_markets().unwrap(),
            vec![MarketType::Totals, MarketType::H2h]
        );
    }

    #[test]
    fn validate_rejects_zero_window() {
        let config = Config {
            middle_window_soccer: Decimal::ZERO,
            ..Config::default()
        };

        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue {
                field: "MIDDLE_WINDOW_SOCCER",
                ..
            })
        ));
    }

    #[test]
    fn settings_carry_configured_values() {
        let config = Config {
            min_profit_margin: dec!(2.5),
            middle_window_basketball: dec!(1.5),
            sharp_books: vec![" Pinnacle ".to_string()],
            ..Config::default()
        };

        let settings = config.settings().unwrap();

        assert_eq!(settings.surebet.min_profit_margin, dec!(2.5));
        assert_eq!(settings.middle.windows.max_window("Basketball"), dec!(1.5));
        assert_eq!(settings.value.sharp_books, vec!["pinnacle"]);
    }

    #[test]
    fn api_key_presence() {
        let mut config = Config::default();
        assert!(!config.has_api_key());
        config.odds_api_key = Some("  ".to_string());
        assert!(!config.has_api_key());
        config.odds_api_key = Some("abc".to_string());
        assert!(config.has_api_key());
    }
}
