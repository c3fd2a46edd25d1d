//! Type-state client connection.
//!
//! The connection moves through three states, each exposing only the
//! commands valid in it:
//!
//! - `NotAuthenticated`: after the greeting; STARTTLS and AUTHENTICATE.
//! - `Authenticated`: SELECT and EXAMINE.
//! - `Selected`: SORT, SEARCH, FETCH, CLOSE and UNSELECT.
//!
//! LOGOUT and CAPABILITY work everywhere.

#![allow(clippy::missing_errors_doc)]

mod authenticated;
mod fetched;
mod not_authenticated;
mod selected;
mod states;

use tokio::io::{AsyncRead, AsyncWrite};
use tracing::debug;

pub use self::fetched::FetchedMessage;
pub use self::states::{Authenticated, NotAuthenticated, Selected};
use super::framed::{FramedStream, ResponseAccumulator, is_continuation, is_tagged_for};
use crate::command::{Command, TagGenerator};
use crate::parser::{Response, ResponseParser, UntaggedResponse};
use crate::types::{Capability, ResponseCode, Status};
use crate::{Error, Result};

/// IMAP client connection in state `State`.
pub struct Client<S, State> {
    pub(crate) stream: FramedStream<S>,
    pub(crate) tag_gen: TagGenerator,
    pub(crate) capabilities: Vec<Capability>,
    pub(crate) in_flight: bool,
    pub(crate) state: State,
}

impl<S, State: std::fmt::Debug> std::fmt::Debug for Client<S, State> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("tag_gen", &self.tag_gen)
            .field("capabilities", &self.capabilities)
            .field("in_flight", &self.in_flight)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl<S, State> Client<S, State>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Returns the server capabilities.
    #[must_use]
    pub fn capabilities(&self) -> &[Capability] {
        &self.capabilities
    }

    /// Checks if the server has a specific capability.
    #[must_use]
    pub fn has_capability(&self, cap: &Capability) -> bool {
        self.capabilities.contains(cap)
    }

    /// Returns true if the server offers STARTTLS.
    #[must_use]
    pub fn supports_starttls(&self) -> bool {
        self.has_capability(&Capability::StartTls)
    }

    /// Returns true if AUTHENTICATE may carry the initial response inline.
    #[must_use]
    pub fn supports_sasl_ir(&self) -> bool {
        self.has_capability(&Capability::SaslIr)
    }

    /// Returns true if the server supports SORT (RFC 5256).
    #[must_use]
    pub fn supports_sort(&self) -> bool {
        self.has_capability(&Capability::Sort)
    }

    /// Returns true if the server supports UNSELECT (RFC 3691).
    #[must_use]
    pub fn supports_unselect(&self) -> bool {
        self.has_capability(&Capability::Unselect)
    }

    /// Returns true if the server advertises `AUTH=<mechanism>`.
    #[must_use]
    pub fn supports_auth(&self, mechanism: &str) -> bool {
        self.capabilities
            .iter()
            .any(|c| matches!(c, Capability::Auth(m) if m.eq_ignore_ascii_case(mechanism)))
    }

    /// True while a command was written but its tagged completion not read.
    ///
    /// Set when a caller abandons a command future midway, e.g. on timeout.
    /// The stream is then out of step and only good for closing.
    #[must_use]
    pub const fn is_in_flight(&self) -> bool {
        self.in_flight
    }

    /// Returns the state value.
    #[must_use]
    pub const fn state(&self) -> &State {
        &self.state
    }

    /// Sends a NOOP.
    pub async fn noop(&mut self) -> Result<()> {
        self.execute(&Command::Noop).await?;
        Ok(())
    }

    /// Sends CAPABILITY and replaces the stored capabilities.
    pub async fn capability(&mut self) -> Result<Vec<Capability>> {
        let responses = self.execute(&Command::Capability).await?;
        self.absorb_capabilities(&responses);
        Ok(self.capabilities.clone())
    }

    /// Logs out and closes the stream.
    ///
    /// LOGOUT is skipped when a previous command was abandoned midway,
    /// since the server's reply could not be told apart from the leftovers.
    pub async fn logout(mut self) -> Result<()> {
        if self.in_flight {
            debug!("command left in flight, closing without LOGOUT");
        } else {
            let tag = self.send(&Command::Logout).await?;
            match self.read_until_tagged(&tag).await {
                Ok(_) | Err(Error::ConnectionClosed) => {}
                Err(e) => return Err(e),
            }
        }
        self.stream.shutdown().await
    }

    /// Writes a command and marks it in flight. Returns its tag.
    ///
    /// A command carrying `{n}` literals goes out one line at a time, each
    /// literal only after the server's continuation request.
    pub(crate) async fn send(&mut self, command: &Command) -> Result<String> {
        let tag = self.tag_gen.next();
        debug!(tag = %tag, command = command.name(), "sending command");
        self.in_flight = true;
        let serialized = command.serialize(&tag);
        let mut lines = serialized.split_inclusive(|&b| b == b'\n').peekable();
        while let Some(line) = lines.next() {
            self.stream.write_command(line).await?;
            if lines.peek().is_some() {
                self.await_continuation(&tag).await?;
            }
        }
        Ok(tag)
    }

    /// Waits for `+` before sending a literal. A tagged reply here means the
    /// server rejected the command early.
    async fn await_continuation(&mut self, tag: &str) -> Result<()> {
        loop {
            let response = self.stream.read_response().await?;
            if is_continuation(&response) {
                return Ok(());
            }
            if is_tagged_for(tag, &response) {
                self.in_flight = false;
                Self::check_tagged_ok(std::slice::from_ref(&response), tag)?;
                return Err(Error::Protocol(format!(
                    "{tag} completed before its literal was sent"
                )));
            }
            debug!(tag, "untagged response while waiting to send a literal");
        }
    }

    /// Runs a command to its tagged completion, failing unless it is OK.
    pub(crate) async fn execute(&mut self, command: &Command) -> Result<Vec<Vec<u8>>> {
        let tag = self.send(command).await?;
        let responses = self.read_until_tagged(&tag).await?;
        Self::check_tagged_ok(&responses, &tag)?;
        Ok(responses)
    }

    /// Reads until the tagged completion for `tag`, then clears in-flight.
    pub(crate) async fn read_until_tagged(&mut self, tag: &str) -> Result<Vec<Vec<u8>>> {
        let responses = ResponseAccumulator::new(tag)
            .read_until_tagged(&mut self.stream)
            .await?;
        self.in_flight = false;
        Ok(responses)
    }

    /// Maps the tagged completion to `Ok` or the matching error.
    pub(crate) fn check_tagged_ok(responses: &[Vec<u8>], tag: &str) -> Result<()> {
        let last = responses
            .last()
            .ok_or_else(|| Error::Protocol("missing tagged response".to_string()))?;

        match ResponseParser::parse(last)? {
            Response::Tagged {
                tag: resp_tag,
                status,
                text,
                ..
            } if resp_tag == tag => match status {
                Status::Ok | Status::PreAuth => Ok(()),
                Status::No => Err(Error::No(text)),
                Status::Bad => Err(Error::Bad(text)),
                Status::Bye => Err(Error::Bye(text)),
            },
            _ => Err(Error::Protocol(format!("expected completion for {tag}"))),
        }
    }

    /// Picks up capabilities from `* CAPABILITY` or a `[CAPABILITY ...]` code.
    pub(crate) fn absorb_capabilities(&mut self, responses: &[Vec<u8>]) {
        for bytes in responses {
            match ResponseParser::parse(bytes) {
                Ok(Response::Untagged(UntaggedResponse::Capability(caps))) => {
                    self.capabilities = caps;
                }
                Ok(
                    Response::Untagged(UntaggedResponse::Ok {
                        code: Some(ResponseCode::Capability(caps)),
                        ..
                    })
                    | Response::Tagged {
                        code: Some(ResponseCode::Capability(caps)),
                        ..
                    },
                ) => self.capabilities = caps,
                _ => {}
            }
        }
    }

    /// Moves the connection into another state.
    pub(crate) fn transition<T>(self, state: T) -> Client<S, T> {
        Client {
            stream: self.stream,
            tag_gen: self.tag_gen,
            capabilities: self.capabilities,
            in_flight: self.in_flight,
            state,
        }
    }
}
