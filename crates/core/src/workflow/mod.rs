//! Conversion workflow state machine.
//!
//! Sequences one file through `Idle -> Previewing -> Converting -> Ready | Failed`:
//! - **Intake**: validation and preview, superseding everything downstream
//! - **Conversion**: a single in-flight session guarded by its identifier
//! - **Playback**: bound to the primary media URL of a successful result
//!
//! The machine is re-entrant: `Ready` and `Failed` accept a new file, and
//! [`Workflow::rearm`] returns to `Previewing` for another attempt on the same file.

mod machine;
mod types;

pub use machine::{Workflow, EVENT_BUFFER};
pub use types::{FileSummary, Stage, WorkflowError, WorkflowEvent, WorkflowSnapshot};
