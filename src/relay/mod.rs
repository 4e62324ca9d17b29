//! Validation-gated relay between the inbound request and the upstream
//! model, in buffered or streaming mode.

mod events;
mod idle;
mod state;
mod types;

pub use events::*;
pub use idle::*;
pub use state::*;
pub use types::*;

use crate::{
    Error, Result,
    json::decode_object,
    schema::{InferenceRequest, SchemaValidator, Violations},
    translate::{self, DeltaStream, FrameStats, FrameStatsSnapshot},
    upstream::{UpstreamClient, UpstreamReply},
};
use futures_util::StreamExt;
use std::{sync::Arc, time::Duration};
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{debug, error, info, warn};

pub struct Relay {
    validator: Arc<SchemaValidator>,
    upstream: Arc<dyn UpstreamClient>,
    idle_timeout: Duration,
    stats: Arc<FrameStats>,
}

impl Relay {
    pub fn new(validator: Arc<SchemaValidator>, upstream: Arc<dyn UpstreamClient>) -> Self {
        Self {
            validator,
            upstream,
            idle_timeout: Duration::ZERO,
            stats: Arc::new(FrameStats::default()),
        }
    }

    /// Limits the wait for each streamed upstream line. Zero disables it.
    pub fn with_idle_timeout(mut self, idle_timeout: Duration) -> Self {
        self.idle_timeout = idle_timeout;
        self
    }

    pub fn frame_stats(&self) -> FrameStatsSnapshot {
        self.stats.snapshot()
    }

    pub fn validate(&self, request: &InferenceRequest) -> std::result::Result<(), Violations> {
        self.validator.validate(request)
    }

    /// Decodes a raw request body and relays it.
    pub async fn handle(&self, body: &[u8], cancel: CancellationToken) -> Result<RelayOutcome> {
        let request: InferenceRequest = match decode_object(body) {
            Ok(request) => request,
            Err(reason) => {
                let mut fsm = RelayStateMachine::new(PLACEHOLDER_ID);
                fsm.transition(RelayEvent::DecodeFailed)?;
                let e = Error::decode(reason);
                warn!("{}: {}", e.category(), e);
                fsm.transition(RelayEvent::ResponseWritten)?;
                return Ok(RelayOutcome::Rejected(RelayErrorStatus::placeholder(
                    e.to_string(),
                )));
            }
        };

        self.handle_request(request, cancel).await
    }

    /// Validates an already decoded request and dispatches it.
    pub async fn handle_request(
        &self,
        request: InferenceRequest,
        cancel: CancellationToken,
    ) -> Result<RelayOutcome> {
        let mut fsm = RelayStateMachine::new(request.id.clone());
        fsm.transition(RelayEvent::Decoded)?;

        if let Err(violations) = self.validator.validate(&request) {
            fsm.transition(RelayEvent::ValidationFailed)?;
            let e = Error::Validation(violations);
            warn!(
                "{}: {} with image size: {}",
                e.category(),
                e,
                request.blob.len()
            );
            fsm.transition(RelayEvent::ResponseWritten)?;
            return Ok(RelayOutcome::Rejected(RelayErrorStatus::placeholder(
                e.to_string(),
            )));
        }
        fsm.transition(RelayEvent::ValidationPassed)?;

        if request.stream {
            fsm.transition(RelayEvent::DispatchStreaming)?;
            info!("Streaming answer for request {}", request.id);
            return Ok(RelayOutcome::Streaming(self.stream(request, fsm, cancel)));
        }

        fsm.transition(RelayEvent::DispatchBuffered)?;
        let outcome = match self.buffered(&request, cancel).await {
            Ok(response) => {
                info!(
                    "Extracted image data for request {} ({} chars)",
                    request.id,
                    response.text.len()
                );
                RelayOutcome::Answered(response)
            }
            Err(e) => {
                warn!(
                    "{}: {} with image size: {}",
                    e.category(),
                    e,
                    request.blob.len()
                );
                RelayOutcome::Failed(RelayErrorStatus::for_request(
                    &request.id,
                    &request.prompt,
                    e.to_string(),
                ))
            }
        };
        fsm.transition(RelayEvent::ResponseWritten)?;
        Ok(outcome)
    }

    /// One buffered upstream call, reduced to the answer text.
    pub async fn buffered(
        &self,
        request: &InferenceRequest,
        cancel: CancellationToken,
    ) -> Result<InferenceResponse> {
        let reply = self
            .upstream
            .call(&request.prompt, &request.blob, false, cancel)
            .await?;

        let text = match reply {
            UpstreamReply::Buffered(body) => translate::extract_answer(&body)?,
            UpstreamReply::Streaming(lines) => {
                // Same content either way: the answer is the joined deltas.
                let mut deltas = translate::deltas(lines, self.stats.clone());
                let mut text = String::new();
                while let Some(delta) = deltas.next().await {
                    text.push_str(delta?.as_str());
                }
                text
            }
        };

        Ok(InferenceResponse { text })
    }

    fn stream(
        &self,
        request: InferenceRequest,
        fsm: RelayStateMachine,
        cancel: CancellationToken,
    ) -> EventStream {
        let exchange = StreamExchange {
            phase: Phase::Connecting(request),
            fsm,
            upstream: self.upstream.clone(),
            stats: self.stats.clone(),
            idle_timeout: self.idle_timeout,
            _guard: cancel.clone().drop_guard(),
            cancel,
            deltas_sent: 0,
        };

        futures_util::stream::unfold(exchange, |mut exchange| async move {
            let event = exchange.next_event().await?;
            Some((event, exchange))
        })
        .boxed()
    }
}

enum Phase {
    Connecting(InferenceRequest),
    Relaying(DeltaStream),
    Closing,
    Closed,
}

/// State of one streaming exchange.
///
/// Dropping it (client gone) cancels the outstanding upstream call.
struct StreamExchange {
    phase: Phase,
    fsm: RelayStateMachine,
    upstream: Arc<dyn UpstreamClient>,
    stats: Arc<FrameStats>,
    idle_timeout: Duration,
    cancel: CancellationToken,
    _guard: DropGuard,
    deltas_sent: usize,
}

impl StreamExchange {
    /// Pulls the next downstream event; `None` once the sentinel is out.
    async fn next_event(&mut self) -> Option<DownstreamEvent> {
        loop {
            match std::mem::replace(&mut self.phase, Phase::Closed) {
                Phase::Connecting(request) => {
                    let reply = self
                        .upstream
                        .call(&request.prompt, &request.blob, true, self.cancel.clone())
                        .await;
                    match reply {
                        Ok(UpstreamReply::Streaming(lines)) => {
                            let lines = IdleTimeout::new(lines, self.idle_timeout).boxed();
                            self.phase =
                                Phase::Relaying(translate::deltas(lines, self.stats.clone()));
                        }
                        Ok(UpstreamReply::Buffered(body)) => {
                            match translate::extract_answer(&body) {
                                Ok(text) => {
                                    self.phase = Phase::Closing;
                                    if !text.is_empty() {
                                        self.deltas_sent += 1;
                                        return Some(DownstreamEvent::Delta(text));
                                    }
                                }
                                Err(e) => return Some(self.fail(e, request.blob.len())),
                            }
                        }
                        Err(e) => return Some(self.fail(e, request.blob.len())),
                    }
                }
                Phase::Relaying(mut deltas) => match deltas.next().await {
                    Some(Ok(delta)) => {
                        self.phase = Phase::Relaying(deltas);
                        self.deltas_sent += 1;
                        return Some(DownstreamEvent::Delta(delta.into_string()));
                    }
                    Some(Err(e)) => return Some(self.fail(e, 0)),
                    None => self.phase = Phase::Closing,
                },
                Phase::Closing => {
                    if let Err(e) = self.fsm.transition(RelayEvent::SentinelWritten) {
                        error!("Relay state machine out of step: {}", e);
                    }
                    debug!(
                        "Stream closed after {} deltas, frame stats: {:?}",
                        self.deltas_sent,
                        self.stats.snapshot()
                    );
                    self.phase = Phase::Closed;
                    return Some(DownstreamEvent::Done);
                }
                Phase::Closed => return None,
            }
        }
    }

    fn fail(&mut self, e: Error, image_size: usize) -> DownstreamEvent {
        if image_size > 0 {
            warn!("{}: {} with image size: {}", e.category(), e, image_size);
        } else {
            warn!("{}: {} after {} deltas", e.category(), e, self.deltas_sent);
        }
        self.phase = Phase::Closing;
        DownstreamEvent::Error(e.to_string())
    }
}
