//! Configuration session for bwizard.
//!
//! Holds the job configuration being built and keeps its issues, cost
//! estimate and command preview in step with every edit.

pub mod preview;
pub mod session;

pub use preview::CommandPreview;
pub use session::Session;
