//! Repository implementations for database operations

pub mod picks;
pub mod runs;
pub mod strategies;
pub mod watchlist;

pub use picks::*;
pub use runs::*;
pub use strategies::*;
pub use watchlist::*;
