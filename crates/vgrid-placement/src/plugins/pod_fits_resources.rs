//! Mandatory free-capacity predicate.

use vgrid_state::State;

use crate::plugin::{FilterPlugin, VReplicaRequest};
use crate::plugins::POD_FITS_RESOURCES;
use crate::status::Status;

const REASON_FULL: &str = "worker at full capacity";

/// Filters out workers with no free capacity left.
///
/// An untouched pool (no committed or reserved placements anywhere) always
/// passes, since every worker is trivially free.
#[derive(Debug, Default)]
pub struct PodFitsResources;

impl FilterPlugin for PodFitsResources {
    fn name(&self) -> &'static str {
        POD_FITS_RESOURCES
    }

    fn filter(&self, state: &State, _request: &VReplicaRequest<'_>, ordinal: i32) -> Status {
        if !state.has_placements() || state.free(ordinal) > 0 {
            Status::success()
        } else {
            Status::unschedulable(REASON_FULL)
        }
    }
}
