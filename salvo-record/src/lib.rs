//! Recording, replay, and re-evaluation of persisted trial traces.

pub mod recorder;
pub mod reeval;
pub mod replayer;

pub use recorder::{record, Manifest};
pub use reeval::{reevaluate, RevalError, RevalOptions};
pub use replayer::{replay, ReplayError, ReplayView};
