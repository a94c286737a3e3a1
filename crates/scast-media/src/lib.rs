//! Timeline calculation, composition planning and render-engine command
//! construction for the Slidecast pipeline.
//!
//! Everything here is pure computation: validation, the closed-form
//! timeline derivation, the engine-agnostic composition plan, and the
//! translation of a plan into a concrete engine invocation. Execution
//! happens elsewhere, inside the render sandbox.

pub mod backend;
pub mod command;
pub mod error;
pub mod filters;
pub mod plan;
pub mod probe;
pub mod timeline;
pub mod validate;

pub use backend::{backend_for, RenderBackend, RenderInvocation, RENDER_OUTPUT_FILE, THUMBNAIL_FILE};
pub use error::{MediaError, MediaResult};
pub use plan::{build_plan, CompositionPlan};
pub use probe::{parse_probe_output, verify_artifact, ProbeSummary};
pub use timeline::Timeline;
pub use validate::{validate_request, ValidationError};
