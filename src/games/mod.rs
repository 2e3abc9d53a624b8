pub mod generator;
pub mod payout;
pub mod symbols;
pub mod types;

pub use generator::OutcomeGenerator;
pub use payout::{resolve, Payout};
pub use symbols::Symbol;
pub use types::*;
