// ABOUTME: SMPP session state machine as a pure transition function over session events
// ABOUTME: Decides which requests each state permits and what side effects a transition needs

use crate::datatypes::{Bind, CommandId};
use crate::pdu::PduBody;
use std::fmt;

/// Type of SMPP bind operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BindType {
    /// Bind as transmitter (can send submit_sm)
    Transmitter,
    /// Bind as receiver (can receive deliver_sm)
    Receiver,
    /// Bind as transceiver (both transmitter and receiver capabilities)
    Transceiver,
}

impl BindType {
    pub fn request_id(&self) -> CommandId {
        match self {
            BindType::Transmitter => CommandId::BindTransmitter,
            BindType::Receiver => CommandId::BindReceiver,
            BindType::Transceiver => CommandId::BindTransceiver,
        }
    }

    /// The bind type a bind request or bind response stands for
    pub fn from_command_id(command_id: CommandId) -> Option<BindType> {
        match command_id {
            CommandId::BindTransmitter | CommandId::BindTransmitterResp => {
                Some(BindType::Transmitter)
            }
            CommandId::BindReceiver | CommandId::BindReceiverResp => Some(BindType::Receiver),
            CommandId::BindTransceiver | CommandId::BindTransceiverResp => {
                Some(BindType::Transceiver)
            }
            _ => None,
        }
    }

    pub(crate) fn request_body(&self, bind: Bind) -> PduBody {
        match self {
            BindType::Transmitter => PduBody::BindTransmitter(bind),
            BindType::Receiver => PduBody::BindReceiver(bind),
            BindType::Transceiver => PduBody::BindTransceiver(bind),
        }
    }
}

impl fmt::Display for BindType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BindType::Transmitter => f.write_str("transmitter"),
            BindType::Receiver => f.write_str("receiver"),
            BindType::Transceiver => f.write_str("transceiver"),
        }
    }
}

/// Session state as seen by the ESME.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    /// Connected but not bound, or the session has ended
    #[default]
    Unbound,
    Bound(BindType),
}

/// Something that happened to the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    /// A bind response with command_status 0 arrived
    BindAccepted(BindType),
    /// Our unbind was answered, or we answered the peer's unbind
    UnbindCompleted,
    /// The transport closed or failed
    Disconnected,
    /// enquire_link went unanswered too many times in a row
    KeepaliveExpired,
    /// The application closed the session
    Closed,
}

/// Side effect the session must carry out after a transition, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notification {
    /// Complete every pending request with `SessionClosed`
    FailPending,
    /// Flush queued frames, then close the transport and stop the tasks
    TearDown,
    /// Publish the new state to subscribers
    StateChanged(SessionState),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub state: SessionState,
    pub notifications: Vec<Notification>,
}

impl SessionState {
    pub fn is_bound(&self) -> bool {
        matches!(self, SessionState::Bound(_))
    }

    /// Compute the next state for `event`.
    ///
    /// Every event other than a bind acceptance ends the session: pending
    /// requests fail before subscribers see the state change.
    pub fn apply(self, event: SessionEvent) -> Transition {
        match (self, event) {
            (SessionState::Unbound, SessionEvent::BindAccepted(bind_type)) => {
                let state = SessionState::Bound(bind_type);
                Transition {
                    state,
                    notifications: vec![Notification::StateChanged(state)],
                }
            }
            // A second bind response on a bound session changes nothing
            (SessionState::Bound(_), SessionEvent::BindAccepted(_)) => Transition {
                state: self,
                notifications: Vec::new(),
            },
            (
                _,
                SessionEvent::UnbindCompleted
                | SessionEvent::Disconnected
                | SessionEvent::KeepaliveExpired
                | SessionEvent::Closed,
            ) => {
                let mut notifications = vec![Notification::FailPending, Notification::TearDown];
                if self != SessionState::Unbound {
                    notifications.push(Notification::StateChanged(SessionState::Unbound));
                }
                Transition {
                    state: SessionState::Unbound,
                    notifications,
                }
            }
        }
    }

    /// Whether a request with `command_id` may be sent in this state.
    ///
    /// Binds are only allowed while unbound, everything else only while
    /// bound. Responses are always allowed.
    pub fn permits(&self, command_id: CommandId) -> bool {
        if command_id.is_response() {
            return true;
        }
        match self {
            SessionState::Unbound => command_id.is_bind(),
            SessionState::Bound(_) => !command_id.is_bind(),
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Unbound => f.write_str("unbound"),
            SessionState::Bound(bind_type) => write!(f, "bound as {bind_type}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bind_moves_to_bound() {
        let transition = SessionState::Unbound.apply(SessionEvent::BindAccepted(BindType::Receiver));
        assert_eq!(transition.state, SessionState::Bound(BindType::Receiver));
        assert_eq!(
            transition.notifications,
            vec![Notification::StateChanged(SessionState::Bound(BindType::Receiver))]
        );
    }

    #[test]
    fn rebind_on_bound_session_is_ignored() {
        let bound = SessionState::Bound(BindType::Transmitter);
        let transition = bound.apply(SessionEvent::BindAccepted(BindType::Transceiver));
        assert_eq!(transition.state, bound);
        assert!(transition.notifications.is_empty());
    }

    #[test]
    fn ending_events_fail_pending_before_publishing() {
        for event in [
            SessionEvent::UnbindCompleted,
            SessionEvent::Disconnected,
            SessionEvent::KeepaliveExpired,
            SessionEvent::Closed,
        ] {
            let transition = SessionState::Bound(BindType::Transceiver).apply(event);
            assert_eq!(transition.state, SessionState::Unbound);
            assert_eq!(
                transition.notifications,
                vec![
                    Notification::FailPending,
                    Notification::TearDown,
                    Notification::StateChanged(SessionState::Unbound),
                ]
            );
        }
    }

    #[test]
    fn disconnect_while_unbound_does_not_publish() {
        let transition = SessionState::Unbound.apply(SessionEvent::Disconnected);
        assert_eq!(transition.state, SessionState::Unbound);
        assert_eq!(
            transition.notifications,
            vec![Notification::FailPending, Notification::TearDown]
        );
    }

    #[test]
    fn request_permissions() {
        let unbound = SessionState::Unbound;
        assert!(unbound.permits(CommandId::BindTransceiver));
        assert!(!unbound.permits(CommandId::SubmitSm));
        assert!(!unbound.permits(CommandId::EnquireLink));
        assert!(unbound.permits(CommandId::GenericNack));

        let bound = SessionState::Bound(BindType::Transmitter);
        assert!(bound.permits(CommandId::SubmitSm));
        assert!(bound.permits(CommandId::Unbind));
        assert!(!bound.permits(CommandId::BindTransmitter));
        assert!(bound.permits(CommandId::DeliverSmResp));
    }

    #[test]
    fn bind_type_from_ids() {
        assert_eq!(
            BindType::from_command_id(CommandId::BindReceiverResp),
            Some(BindType::Receiver)
        );
        assert_eq!(BindType::from_command_id(CommandId::SubmitSm), None);
        assert_eq!(BindType::Transceiver.request_id(), CommandId::BindTransceiver);
    }
}
