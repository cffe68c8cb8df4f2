pub mod activity;
pub mod session;
pub mod user;

pub use activity::{Activity, NewActivity};
pub use session::{
  CompletionSource, NewTrainingSession, PlanningSource, TrainingSession, TrainingSessionStatus,
};
pub use user::{User, UserRole, UserSettings};
