//! Lowest-ordinal packing priority.

use vgrid_state::State;

use crate::plugin::{ScorePlugin, VReplicaRequest};
use crate::plugins::LOWEST_ORDINAL_PRIORITY;
use crate::status::Status;

const REASON_NEGATIVE: &str = "computed score is negative";

/// Prefers lower ordinals, packing the front of the pool.
///
/// `score = (last_ordinal + 2) * 100 - ordinal`: the multiplier keeps the
/// ordinal ranking strictly dominant over small secondary scores, and the
/// `+ 2` keeps scores positive for every ordinal up to one past the last
/// occupied worker.
#[derive(Debug, Default)]
pub struct LowestOrdinalPriority;

impl ScorePlugin for LowestOrdinalPriority {
    fn name(&self) -> &'static str {
        LOWEST_ORDINAL_PRIORITY
    }

    fn score(&self, state: &State, _request: &VReplicaRequest<'_>, ordinal: i32) -> (i64, Status) {
        let score = i64::from(state.last_ordinal + 2) * 100 - i64::from(ordinal);
        if score < 0 {
            (0, Status::error(REASON_NEGATIVE))
        } else {
            (score, Status::success())
        }
    }
}
