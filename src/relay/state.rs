use crate::{Error, Result};
use tracing::{debug, warn};

// Relay states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayState {
    Received,
    Validating,
    Rejected,
    Dispatching,
    BufferedReturn,
    Streaming,
    Closed,
}

// Relay events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayEvent {
    Decoded,
    DecodeFailed,
    ValidationPassed,
    ValidationFailed,
    DispatchBuffered,
    DispatchStreaming,
    ResponseWritten,
    SentinelWritten,
}

/// Lifecycle of one inbound request.
pub struct RelayStateMachine {
    state: RelayState,
    request_id: String,
}

impl RelayStateMachine {
    pub fn new(request_id: impl Into<String>) -> Self {
        Self {
            state: RelayState::Received,
            request_id: request_id.into(),
        }
    }

    pub fn current_state(&self) -> RelayState {
        self.state
    }

    pub fn transition(&mut self, event: RelayEvent) -> Result<RelayState> {
        use RelayEvent as E;
        use RelayState as S;

        let new_state = match (self.state, event) {
            (S::Received, E::Decoded) => S::Validating,
            (S::Received, E::DecodeFailed) => S::Rejected,
            (S::Validating, E::ValidationFailed) => S::Rejected,
            (S::Validating, E::ValidationPassed) => S::Dispatching,
            (S::Dispatching, E::DispatchBuffered) => S::BufferedReturn,
            (S::Dispatching, E::DispatchStreaming) => S::Streaming,
            (S::Rejected, E::ResponseWritten) => S::Closed,
            (S::BufferedReturn, E::ResponseWritten) => S::Closed,
            (S::Streaming, E::SentinelWritten) => S::Closed,
            (state, event) => {
                warn!(
                    "Invalid relay transition from {:?} with event {:?} (request {})",
                    state, event, self.request_id
                );
                return Err(Error::internal(format!(
                    "Invalid relay transition from {:?} with event {:?}",
                    state, event
                )));
            }
        };

        debug!(
            "Relay {}: {:?} -> {:?} ({:?})",
            self.request_id, self.state, new_state, event
        );
        self.state = new_state;
        Ok(new_state)
    }

    pub fn is_terminal(&self) -> bool {
        self.state == RelayState::Closed
    }
}
