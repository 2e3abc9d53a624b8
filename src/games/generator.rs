//! Server-side reel outcome generation
//!
//! Outcomes are only ever produced here; client-supplied symbols are never
//! consulted.

use super::symbols::{total_weight, Symbol, FALLBACK_SYMBOL, WEIGHTED_SYMBOLS};
use rand::Rng;

/// Chance that a third reel copies the first two when they already match.
pub const NEAR_MISS_BOOST: f64 = 0.15;

/// Weighted three-reel outcome generator
#[derive(Debug, Clone, Copy, Default)]
pub struct OutcomeGenerator;

impl OutcomeGenerator {
    pub fn new() -> Self {
        Self
    }

    /// Draw a fresh outcome from the thread-local entropy source
    pub fn generate(&self) -> [Symbol; 3] {
        self.generate_with(&mut rand::thread_rng())
    }

    /// Draw a fresh outcome from the given entropy source.
    ///
    /// Reels one and two are independent weighted draws. Reel three copies
    /// them with probability [`NEAR_MISS_BOOST`] when they are equal and is
    /// an independent weighted draw otherwise.
    pub fn generate_with<R: Rng + ?Sized>(&self, rng: &mut R) -> [Symbol; 3] {
        let first = weighted_symbol(rng);
        let second = weighted_symbol(rng);
        let third = if first == second && rng.gen_bool(NEAR_MISS_BOOST) {
            first
        } else {
            weighted_symbol(rng)
        };
        [first, second, third]
    }
}

/// Cumulative-weight draw over the fixed symbol order
pub fn weighted_symbol<R: Rng + ?Sized>(rng: &mut R) -> Symbol {
    let mut remaining = rng.gen::<f64>() * total_weight() as f64;

    for (symbol, weight) in WEIGHTED_SYMBOLS {
        remaining -= weight as f64;
        if remaining <= 0.0 {
            return symbol;
        }
    }

    tracing::error!(remaining, "weighted draw fell through the symbol table");
    FALLBACK_SYMBOL
}
