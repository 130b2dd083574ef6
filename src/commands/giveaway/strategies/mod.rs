pub mod base;
pub mod uniform;

pub use crate::commands::giveaway::strategies::base::{DrawOptions, GiveawayStrategy};
pub use crate::commands::giveaway::strategies::uniform::UniformDrawStrategy;
