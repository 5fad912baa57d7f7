//! Domain models for report submissions and validation attempts.

mod events;
mod query;
mod report;
mod submission;
mod validation_result;

pub use events::*;
pub use query::*;
pub use report::*;
pub use submission::*;
pub use validation_result::*;
