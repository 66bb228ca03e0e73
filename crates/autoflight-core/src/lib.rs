pub mod consts;
pub mod error;
pub mod frame;
pub mod io;
pub mod pipeline;
pub mod security;
pub mod stitch;

pub use error::{AutoflightError, Result};
pub use pipeline::{create_orthomosaic, RunOptions, RunOutcome};
pub use stitch::{StitchEngine, StitchMode};
