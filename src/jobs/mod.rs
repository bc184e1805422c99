//! Job lifecycle
//!
//! - `registry`: cancellation tokens of in-flight analyses
//! - `worker`: the single background worker loop
//! - `control`: submit/list/get/delete/stop/rerun for front ends

mod control;
mod registry;
mod worker;

pub use control::{validate_ids, validate_url, ControlError, ControlResult, JobControl};
pub use registry::{CancellationRegistry, RegistrationGuard};
pub use worker::{Tick, Worker};
