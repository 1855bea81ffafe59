//! Job configuration model for bwizard.
//!
//! The mutable aggregate the wizard builds, the issues reported against it,
//! and the portable record used to save and restore it.

pub mod issue;
pub mod job;
pub mod record;
pub mod store;

pub use issue::{has_errors, Field, Issue, Severity};
pub use job::{
    ArraySpec, EnvVars, GpuConfiguration, GpuMode, JobConfiguration, KindMismatch, KindSettings,
    LicenseRequest, UnknownGpuMode,
};
pub use record::{ArrayRecord, EnvEntry, GpuRecord, LicenseEntry, PortableRecord, Restored};
pub use store::{RecordStore, StoreError};
