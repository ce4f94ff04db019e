// ABOUTME: Extension points of the session: the transport bound and inbound PDU handlers
// ABOUTME: Includes a logging default handler and a handler that forwards events into a channel

use crate::client::session::Session;
use crate::codec::{CodecError, PduHeader};
use crate::datatypes::CommandStatus;
use crate::pdu::{Pdu, PduBody};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Byte stream a session runs over, e.g. a `TcpStream` or a TLS stream
pub trait Transport: AsyncRead + AsyncWrite + Send + Unpin + 'static {}

impl<T> Transport for T where T: AsyncRead + AsyncWrite + Send + Unpin + 'static {}

/// Something the peer sent that no local request was waiting for.
#[derive(Debug)]
pub enum InboundEvent {
    /// A request from the peer (deliver_sm, data_sm, alert_notification,
    /// unbind, outbind or an unknown command_id). enquire_link never shows
    /// up here; the session answers it.
    Request(Pdu),
    /// A response whose sequence number matches no pending request,
    /// typically one that arrived after its request timed out
    Unsolicited(Pdu),
    /// A frame whose body could not be decoded. The header is intact, so
    /// the frame can still be answered by sequence number.
    Undecodable { header: PduHeader, error: CodecError },
}

/// Receives inbound events from the session's reader task.
///
/// Called in wire order on the reader task, so implementations must not
/// block. Answer requests with [`Session::respond`].
pub trait InboundHandler: Send + Sync + 'static {
    fn handle(&self, event: InboundEvent, session: &Session);
}

/// Default handler: logs every event and keeps the session consistent.
///
/// Unknown command_ids and undecodable requests get a `generic_nack`, a peer
/// `unbind` gets its `unbind_resp`. Everything else is only logged.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingHandler;

impl InboundHandler for LoggingHandler {
    fn handle(&self, event: InboundEvent, session: &Session) {
        let reply = match event {
            InboundEvent::Request(pdu) => {
                info!(
                    sequence = pdu.sequence_number,
                    command_id = ?pdu.command_id(),
                    "Inbound request"
                );
                match pdu.body {
                    PduBody::Unknown { .. } => Some(Pdu::generic_nack(
                        pdu.sequence_number,
                        CommandStatus::InvalidCommandId,
                    )),
                    PduBody::Unbind => Some(Pdu::new(pdu.sequence_number, PduBody::UnbindResp)),
                    _ => None,
                }
            }
            InboundEvent::Unsolicited(pdu) => {
                warn!(
                    sequence = pdu.sequence_number,
                    command_id = ?pdu.command_id(),
                    status = %pdu.command_status,
                    "Unsolicited response"
                );
                None
            }
            InboundEvent::Undecodable { header, error } => {
                warn!(
                    sequence = header.sequence_number,
                    command_id = ?header.command_id,
                    %error,
                    "Undecodable PDU"
                );
                // Responses are never answered
                (!header.command_id.is_response())
                    .then(|| Pdu::generic_nack(header.sequence_number, error.to_command_status()))
            }
        };

        if let Some(reply) = reply {
            if let Err(error) = session.respond(reply) {
                debug!(%error, "Could not answer inbound PDU");
            }
        }
    }
}

/// Forwards every inbound event into a channel for the application to
/// consume at its own pace.
///
/// # Example
///
/// ```rust,no_run
/// # use smpp_engine::client::{ChannelHandler, InboundEvent, Session, SessionConfig};
/// # async fn example(stream: tokio::net::TcpStream) {
/// let session = Session::new(stream, SessionConfig::default());
/// let (handler, mut events) = ChannelHandler::new();
/// session.set_inbound_handler(handler);
///
/// while let Some(event) = events.recv().await {
///     if let InboundEvent::Request(pdu) = event {
///         println!("{:?}", pdu.command_id());
///     }
/// }
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ChannelHandler {
    events: mpsc::UnboundedSender<InboundEvent>,
}

impl ChannelHandler {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<InboundEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        (Self { events }, rx)
    }
}

impl InboundHandler for ChannelHandler {
    fn handle(&self, event: InboundEvent, _session: &Session) {
        if self.events.send(event).is_err() {
            debug!("Inbound event dropped, receiver is gone");
        }
    }
}
