//! Client side of the slide deck generation service: the session state
//! machine, its WebSocket transport, derived progress views and the REST
//! helpers around them.

pub mod api;
pub mod error;
pub mod projection;
pub mod session;
pub mod transport;
pub mod validation;

pub use api::ServiceApi;
pub use error::GenerationError;
pub use projection::{
    active_step_count, is_generating, progress_steps, PreviewCursor, ProgressStep, StepStatus,
};
pub use session::{apply_event, SessionState};
pub use transport::{GenerationClient, GenerationHandle};
pub use validation::{validate_request, GenerationRequest, ValidationError};

#[cfg(test)]
#[path = "tests/fixtures.rs"]
pub(crate) mod fixtures;
