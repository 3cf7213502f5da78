//! Request/response cycle of one client connection.
//!
//! ```text
//! AwaitRequest -> Validating -> Updating -> Sending -> AwaitRequest
//!                      |                                    ^
//!                      +------------ out of range ----------+
//! ```
//!
//! Any state moves to `Closed` when the peer hangs up or an I/O operation
//! fails. Out-of-range requests are dropped without a reply and the
//! connection stays open.

use crate::aggregate::Aggregate;
use crate::codec::{Request, Response};
use crate::error::Error;
use crate::transport::Transport;
use std::sync::Arc;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum State {
    AwaitRequest,
    Validating(Request),
    Updating(i32),
    Sending(Response),
    Closed,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionSummary {
    pub accepted: u64,
    pub rejected: u64,
}

pub struct Session<T> {
    transport: T,
    aggregate: Arc<Aggregate>,
    state: State,
    summary: SessionSummary,
}

impl<T: Transport> Session<T> {
    pub fn new(transport: T, aggregate: Arc<Aggregate>) -> Session<T> {
        Session {
            transport,
            aggregate,
            state: State::AwaitRequest,
            summary: SessionSummary::default(),
        }
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn summary(&self) -> SessionSummary {
        self.summary
    }

    /// Performs one transition and returns the new state.
    ///
    /// A graceful hang-up by the peer yields `Ok(State::Closed)`; any other
    /// failure closes the session and is returned as the error.
    pub fn step(&mut self) -> Result<State, Error> {
        let state = self.state;
        let next = match state {
            State::AwaitRequest => match self.transport.receive::<Request>() {
                Ok(request) => State::Validating(request),
                Err(Error::PeerClosed) => State::Closed,
                Err(e) => return Err(self.close(e)),
            },
            State::Validating(request) if request.is_valid() => State::Updating(request.0),
            State::Validating(Request(value)) => {
                warn!(value, "Received invalid number");
                self.summary.rejected += 1;
                State::AwaitRequest
            }
            State::Updating(value) => {
                let mean = self.aggregate.observe(value);
                debug!(value, mean, "Received number");
                self.summary.accepted += 1;
                State::Sending(Response::from(mean))
            }
            State::Sending(response) => match self.transport.send(&response) {
                Ok(()) => State::AwaitRequest,
                Err(e) => return Err(self.close(e)),
            },
            State::Closed => State::Closed,
        };

        self.state = next;
        Ok(next)
    }

    /// Drives the session until it closes.
    pub fn run(mut self) -> Result<SessionSummary, Error> {
        while self.step()? != State::Closed {}
        Ok(self.summary)
    }

    fn close(&mut self, e: Error) -> Error {
        self.state = State::Closed;
        e
    }
}
