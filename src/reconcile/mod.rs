//! Activity-to-session reconciliation

pub mod completion;
pub mod linker;
pub mod matcher;
pub mod reconciler;

pub use linker::{LinkConflict, LinkOutcome};
pub use reconciler::{Reconciler, FREE_WORKOUT_TITLE};
