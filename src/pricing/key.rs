//! Outcome identity within a market.

use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Outcome name plus optional line. Points compare numerically.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct OutcomeKey {
    /// Team or side name ("Over"/"Under" for totals).
    pub name: String,
    /// Line value for spreads/totals.
    pub point: Option<Decimal>,
}

impl OutcomeKey {
    /// Key without a line.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            point: None,
        }
    }

    /// Key with a line.
    pub fn with_point(name: impl Into<String>, point: Decimal) -> Self {
        Self {
            name: name.into(),
            point: Some(point),
        }
    }
}

impl fmt::Display for OutcomeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.point {
            Some(point) => write!(f, "{}@{}", self.name, point.normalize()),
            None => write!(f, "{}", self.name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::collections::HashSet;

    #[test]
    fn display_includes_point() {
        assert_eq!(OutcomeKey::named("Arsenal").to_string(), "Arsenal");
        assert_eq!(
            OutcomeKey::with_point("Lakers", dec!(-6.50)).to_string(),
            "Lakers@-6.5"
        );
        assert_eq!(
            OutcomeKey::with_point("Over", dec!(210.5)).to_string(),
            "Over@210.5"
        );
    }

    #[test]
    fn points_compare_numerically() {
        let a = OutcomeKey::with_point("Lakers", dec!(-6.5));
        let b = OutcomeKey::with_point("Lakers", dec!(-6.50));
        assert_eq!(a, b);

        let set: HashSet<_> = [a, b].into_iter().collect();
        assert_eq!(set.len(), 1);
    }
}
