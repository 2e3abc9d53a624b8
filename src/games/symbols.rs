use serde::{Deserialize, Serialize};
use std::fmt;

/// Reel symbol. Wire form is the glyph shown on the reel.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Symbol {
    /// The lucky mark; three of them is the jackpot
    #[serde(rename = "7")]
    Seven,
    #[serde(rename = "🍒")]
    Cherry,
    #[serde(rename = "🍋")]
    Lemon,
    #[serde(rename = "🔔")]
    Bell,
    #[serde(rename = "⭐")]
    Star,
    #[serde(rename = "🍀")]
    Clover,
    #[serde(rename = "💎")]
    Diamond,
}

/// Draw order for the cumulative-weight walk. Weights sum to 100.
pub const WEIGHTED_SYMBOLS: [(Symbol, u32); 7] = [
    (Symbol::Seven, 17),
    (Symbol::Cherry, 20),
    (Symbol::Lemon, 18),
    (Symbol::Bell, 15),
    (Symbol::Star, 12),
    (Symbol::Clover, 10),
    (Symbol::Diamond, 8),
];

/// Most common symbol, returned if the weighted walk falls through
pub const FALLBACK_SYMBOL: Symbol = Symbol::Cherry;

impl Symbol {
    pub const LUCKY: Symbol = Symbol::Seven;

    pub fn all() -> impl Iterator<Item = Symbol> {
        WEIGHTED_SYMBOLS.iter().map(|(symbol, _)| *symbol)
    }

    pub fn glyph(self) -> &'static str {
        match self {
            Symbol::Seven => "7",
            Symbol::Cherry => "🍒",
            Symbol::Lemon => "🍋",
            Symbol::Bell => "🔔",
            Symbol::Star => "⭐",
            Symbol::Clover => "🍀",
            Symbol::Diamond => "💎",
        }
    }

    pub fn from_glyph(glyph: &str) -> Option<Self> {
        Symbol::all().find(|s| s.glyph() == glyph)
    }

    pub fn weight(self) -> u32 {
        WEIGHTED_SYMBOLS
            .iter()
            .find(|(symbol, _)| *symbol == self)
            .map(|(_, weight)| *weight)
            .unwrap_or(0)
    }

    pub fn is_lucky(self) -> bool {
        self == Symbol::LUCKY
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.glyph())
    }
}

pub fn total_weight() -> u32 {
    WEIGHTED_SYMBOLS.iter().map(|(_, weight)| weight).sum()
}
