use super::{ContentDelta, FrameOutcome, UpstreamFrame, classify, decode_delta};
use crate::{Result, upstream::LineStream};
use futures_util::{StreamExt, stream::BoxStream};
use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};
use tracing::{debug, warn};

pub type DeltaStream = BoxStream<'static, Result<ContentDelta>>;

/// Process-wide frame counters for streaming exchanges.
#[derive(Debug, Default)]
pub struct FrameStats {
    frames: AtomicU64,
    deltas: AtomicU64,
    skipped: AtomicU64,
    unterminated: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FrameStatsSnapshot {
    pub frames: u64,
    pub deltas: u64,
    pub skipped: u64,
    pub unterminated: u64,
}

impl FrameStats {
    pub fn snapshot(&self) -> FrameStatsSnapshot {
        FrameStatsSnapshot {
            frames: self.frames.load(Ordering::Relaxed),
            deltas: self.deltas.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
            unterminated: self.unterminated.load(Ordering::Relaxed),
        }
    }
}

struct DeltaState {
    lines: LineStream,
    stats: Arc<FrameStats>,
    finished: bool,
}

/// Decodes upstream lines into content deltas.
///
/// The stream ends when the `[DONE]` sentinel is seen, when the upstream
/// closes, or after yielding a transport error. Malformed data frames are
/// dropped and counted in `stats`.
pub fn deltas(lines: LineStream, stats: Arc<FrameStats>) -> DeltaStream {
    let state = DeltaState {
        lines,
        stats,
        finished: false,
    };

    futures_util::stream::unfold(state, |mut state| async move {
        if state.finished {
            return None;
        }
        loop {
            let line = match state.lines.next().await {
                Some(Ok(line)) => line,
                Some(Err(e)) => {
                    state.finished = true;
                    return Some((Err(e), state));
                }
                None => {
                    state.stats.unterminated.fetch_add(1, Ordering::Relaxed);
                    warn!("Upstream stream closed without a [DONE] sentinel");
                    return None;
                }
            };

            let payload = match classify(&line) {
                UpstreamFrame::Data(payload) => payload,
                UpstreamFrame::Done => {
                    debug!("Upstream sentinel received");
                    return None;
                }
                UpstreamFrame::Other => continue,
            };

            state.stats.frames.fetch_add(1, Ordering::Relaxed);
            match decode_delta(&payload) {
                FrameOutcome::Delta(delta) => {
                    state.stats.deltas.fetch_add(1, Ordering::Relaxed);
                    return Some((Ok(delta), state));
                }
                FrameOutcome::Empty => continue,
                FrameOutcome::Malformed(reason) => {
                    let skipped = state.stats.skipped.fetch_add(1, Ordering::Relaxed) + 1;
                    warn!(
                        "Skipping malformed upstream frame ({}), {} skipped so far",
                        reason, skipped
                    );
                }
            }
        }
    })
    .boxed()
}
