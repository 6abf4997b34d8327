//! Progress reporting for pipeline runs.
//!
//! The pipeline reports the stages of a run through [`ProgressCallback`]:
//! squad page, roster size, each profile, and the outcome. How that is
//! shown is up to the caller (an `indicatif` bar in the CLI, nothing in the
//! server and in tests).

use std::sync::Arc;

/// Receives stage updates from a pipeline run.
///
/// Updates arrive from concurrent profile fetches, hence `Send + Sync`.
pub trait ProgressCallback: Send + Sync {
    /// The squad page of `club` is being fetched.
    fn squad_started(&self, club: &str);

    /// The squad page listed `profiles` profile pages.
    fn roster_found(&self, profiles: u64);

    /// One profile fetch finished; `ok` is `false` if it failed.
    fn profile_done(&self, url: &str, ok: bool);

    /// The run ranked `ranked` players and dropped `skipped`.
    fn completed(&self, ranked: usize, skipped: usize);

    /// The run was aborted.
    fn failed(&self, reason: &str);
}

/// Discards every update.
pub struct NullProgress;

impl ProgressCallback for NullProgress {
    fn squad_started(&self, _club: &str) {}
    fn roster_found(&self, _profiles: u64) {}
    fn profile_done(&self, _url: &str, _ok: bool) {}
    fn completed(&self, _ranked: usize, _skipped: usize) {}
    fn failed(&self, _reason: &str) {}
}

/// Returns a shared [`NullProgress`].
#[must_use]
pub fn null_progress() -> Arc<dyn ProgressCallback> {
    Arc::new(NullProgress)
}
