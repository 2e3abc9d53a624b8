//! Payout resolution for a three-symbol outcome

use super::symbols::Symbol;

/// Points per combination key. Keys are glyphs joined with `-`.
const PAYOUTS: &[(&str, u64)] = &[
    ("7-7-7", 777),
    ("💎-💎-💎", 200),
    ("🍀-🍀-🍀", 100),
    ("⭐-⭐-⭐", 75),
    ("🔔-🔔-🔔", 50),
    ("🍋-🍋-🍋", 30),
    ("🍒-🍒-🍒", 20),
    ("7-7", 25),
    ("💎-💎", 15),
    ("🍀-🍀", 10),
    ("⭐-⭐", 8),
    ("🔔-🔔", 5),
    ("🍋-🍋", 3),
    ("🍒-🍒", 2),
    ("7", 5),
    ("none", 0),
];

pub const SINGLE_LUCKY_LABEL: &str = "Single 7";
pub const NO_MATCH_LABEL: &str = "No match";

/// Look up a combination key, unknown keys pay nothing
pub fn payout_for(key: &str) -> u64 {
    PAYOUTS
        .iter()
        .find(|(k, _)| *k == key)
        .map(|(_, points)| *points)
        .unwrap_or(0)
}

/// Points and rule label for one resolved outcome
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payout {
    pub points: u64,
    pub match_type: String,
}

/// Resolve an outcome. The first matching rule wins: triple, first two,
/// last two, first & last, single lucky mark, nothing.
pub fn resolve(symbols: &[Symbol; 3]) -> Payout {
    let [s1, s2, s3] = *symbols;

    if s1 == s2 && s2 == s3 {
        let key = format!("{}-{}-{}", s1, s2, s3);
        return Payout {
            points: payout_for(&key),
            match_type: key,
        };
    }

    let pair = if s1 == s2 {
        Some((s1, "first two"))
    } else if s2 == s3 {
        Some((s2, "last two"))
    } else if s1 == s3 {
        Some((s1, "first & last"))
    } else {
        None
    };

    if let Some((symbol, position)) = pair {
        let key = format!("{}-{}", symbol, symbol);
        return Payout {
            points: payout_for(&key),
            match_type: format!("{} ({})", key, position),
        };
    }

    if symbols.iter().any(|s| s.is_lucky()) {
        return Payout {
            points: payout_for(Symbol::LUCKY.glyph()),
            match_type: SINGLE_LUCKY_LABEL.to_string(),
        };
    }

    Payout {
        points: payout_for("none"),
        match_type: NO_MATCH_LABEL.to_string(),
    }
}
