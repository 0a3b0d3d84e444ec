use crate::error::{HistsnapError, Result};
use crate::model::{CommitRef, Sample};
use tracing::warn;

/// Pick `count` commits spread over `timeline` (oldest first).
///
/// With `L` commits and `count <= L` the picks sit at `i * (L / count)`, so
/// when `L` is not a multiple of `count` the newest commits are never chosen.
/// A timeline shorter than `count` is returned whole and flagged as degraded.
pub fn sample_commits(timeline: &[CommitRef], count: usize) -> Result<Sample> {
    if count == 0 {
        return Err(HistsnapError::InvalidSampleCount(count));
    }

    let len = timeline.len();
    if len < count {
        warn!(
            available = len,
            requested = count,
            "timeline shorter than requested sample, taking every commit"
        );
        return Ok(Sample {
            commits: timeline.to_vec(),
            degraded: true,
        });
    }

    let step = len / count;
    let commits = (0..count).map(|i| timeline[i * step].clone()).collect();
    Ok(Sample {
        commits,
        degraded: false,
    })
}
