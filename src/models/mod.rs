//! Core data models: record trees, positions, sessions and derived stats.

mod ids;
mod mode;
mod position;
mod record;
pub mod session;
mod stats;

pub use ids::*;
pub use mode::*;
pub use position::*;
pub use record::*;
pub use session::{is_qualifying_session, is_race_session, SessionKind};
pub use stats::*;
