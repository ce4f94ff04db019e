// ABOUTME: Tracks requests awaiting a response, keyed by sequence number
// ABOUTME: Completes each waiter exactly once with the response, a remote error, a timeout or closure

use crate::client::error::{SmppError, SmppResult};
use crate::datatypes::CommandId;
use crate::pdu::Pdu;
use std::collections::HashMap;
use tokio::sync::{OwnedSemaphorePermit, oneshot};
use tokio::time::Instant;

/// One request awaiting its response. Holds an in-flight slot until it is
/// completed, failed or dropped.
#[derive(Debug)]
pub(crate) struct PendingRequest {
    pub command_id: CommandId,
    pub deadline: Instant,
    reply: oneshot::Sender<SmppResult<Pdu>>,
    _permit: OwnedSemaphorePermit,
}

impl PendingRequest {
    pub fn new(
        command_id: CommandId,
        deadline: Instant,
        permit: OwnedSemaphorePermit,
    ) -> (Self, oneshot::Receiver<SmppResult<Pdu>>) {
        let (reply, rx) = oneshot::channel();
        (
            Self {
                command_id,
                deadline,
                reply,
                _permit: permit,
            },
            rx,
        )
    }

    /// Check `response` against the request and hand the outcome to the
    /// waiter.
    pub fn complete(self, response: Pdu) {
        let outcome = self.check(response);
        // The waiter may have given up; nothing to do then
        let _ = self.reply.send(outcome);
    }

    pub fn fail(self, error: SmppError) {
        let _ = self.reply.send(Err(error));
    }

    fn check(&self, response: Pdu) -> SmppResult<Pdu> {
        let actual = response.command_id();
        let expected = self.command_id.response_id();
        // A nack without an error status says nothing about the request
        if actual == CommandId::GenericNack && !response.command_status.is_ok() {
            return Err(SmppError::RemoteError(response.command_status));
        }
        if expected != Some(actual) {
            return Err(SmppError::UnexpectedPdu {
                expected: expected.unwrap_or(CommandId::GenericNack),
                actual,
            });
        }

        if !response.command_status.is_ok() {
            return Err(SmppError::RemoteError(response.command_status));
        }

        Ok(response)
    }
}

/// In-flight requests of one session
#[derive(Debug, Default)]
pub(crate) struct PendingMap {
    entries: HashMap<u32, PendingRequest>,
}

impl PendingMap {
    pub fn insert(&mut self, sequence: u32, request: PendingRequest) {
        self.entries.insert(sequence, request);
    }

    pub fn contains(&self, sequence: u32) -> bool {
        self.entries.contains_key(&sequence)
    }

    pub fn take(&mut self, sequence: u32) -> Option<PendingRequest> {
        self.entries.remove(&sequence)
    }

    /// Remove every request whose deadline is at or before `now`
    pub fn expire(&mut self, now: Instant) -> Vec<(u32, PendingRequest)> {
        let expired: Vec<u32> = self
            .entries
            .iter()
            .filter(|(_, request)| request.deadline <= now)
            .map(|(&sequence, _)| sequence)
            .collect();

        expired
            .into_iter()
            .filter_map(|sequence| self.take(sequence).map(|request| (sequence, request)))
            .collect()
    }

    pub fn drain(&mut self) -> Vec<(u32, PendingRequest)> {
        self.entries.drain().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}
