//! UKNF Report Services
//!
//! Use cases of the report lifecycle: accepting submissions and corrections,
//! starting validation, recording engine outcomes, reviewer actions and read
//! queries. Collaborators outside the core (entity directory, validation
//! engine, event sink) are reached through the traits defined here.

pub mod directory;
pub mod engine;
pub mod events;
pub mod lifecycle;
pub mod recorder;
pub mod submission;

pub use directory::{EntityDirectory, EntityInfo, StaticEntityDirectory};
pub use engine::{ChannelValidationEngine, ValidationEngine, ValidationRequest};
pub use events::{
    publish_in_background, ChannelEventPublisher, ReportEventPublisher, TracingEventPublisher,
};
pub use lifecycle::{ReportFile, ReportLifecycleService};
pub use recorder::{RecordOutcome, ValidationOutcome, ValidationResultRecorder};
pub use submission::SubmissionOrchestrator;
