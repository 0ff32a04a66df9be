//! Odds source abstraction and payload decoding.

use async_trait::async_trait;
use serde_json::Value;
use tracing::warn;

use super::types::{Event, Sport};
use crate::error::OddsError;

/// Supplier of in-season sports and their event snapshots.
#[async_trait]
pub trait OddsSource: Send + Sync {
    /// List in-season sports.
    async fn sports(&self) -> Result<Vec<Sport>, OddsError>;

    /// Fetch the current event snapshots for a sport.
    async fn events(&self, sport_key: &str) -> Result<Vec<Event>, OddsError>;
}

/// Decode a JSON array of events, skipping entries that do not decode.
pub fn parse_events(payload: Value, sport_key: &str) -> Result<Vec<Event>, OddsError> {
    let Value::Array(items) = payload else {
        return Err(OddsError::ParseError(format!(
            "expected an array of events for {sport_key}"
        )));
    };

    let total = items.len();
    let events: Vec<Event> = items
        .into_iter()
        .enumerate()
        .filter_map(|(idx, item)| match serde_json::from_value::<Event>(item) {
            Ok(event) => Some(event),
            Err(e) => {
                warn!(sport = %sport_key, index = idx, error = %e, "Skipping malformed event");
                None
            }
        })
        .collect();

    if events.len() < total {
        warn!(
            sport = %sport_key,
            decoded = events.len(),
            total,
            "Some events were skipped"
        );
    }

    Ok(events)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parse_events_skips_malformed_entries() {
        let payload = json!([
            {
                "id": "ok",
                "sport_key": "soccer_epl",
                "sport_title": "EPL",
                "commence_time": "2026-10-20T15:00:00Z",
                "home_team": "Arsenal",
                "away_team": "Chelsea",
                "bookmakers": []
            },
            { "id": "missing-teams", "sport_key": "soccer_epl" }
        ]);

        let events = parse_events(payload, "soccer_epl").unwrap();

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].id, "ok");
    }

    #[test]
    fn parse_events_rejects_non_array() {
        let result = parse_events(json!({"message": "quota"}), "soccer_epl");
        assert!(matches!(result, Err(OddsError::ParseError(_))));
    }
}
