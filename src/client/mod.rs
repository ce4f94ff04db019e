// ABOUTME: ESME side of SMPP: an async session with state machine, request correlation and keep-alive
// ABOUTME: Exports the session, its configuration, error types, inbound handlers and message builders

//! SMPP Client Module
//!
//! A [`Session`] drives one SMPP connection from the ESME side:
//!
//! * **Request correlation** - every request gets a fresh sequence number and
//!   a [`ResponseHandle`] that resolves to the matching response, an error
//!   status, a timeout, or `SessionClosed`
//! * **State enforcement** - operations the current bind does not allow fail
//!   locally without touching the transport
//! * **Keep-alive** - enquire_link is sent when the link goes idle and peer
//!   enquire_links are answered automatically
//! * **Flow control** - at most `max_in_flight` requests await a response
//! * **Segmentation** - [`Session::submit`] splits long text with UDH or SAR
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use smpp_engine::client::{ClientBuilder, SmsMessage};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let session = ClientBuilder::transmitter("localhost:2775", "system_id", "password").await?;
//!
//! let message = SmsMessage::new("447700900123", "ACME", "Hello!");
//! let ids = session.submit(&message).await?;
//! println!("Message id: {}", ids[0].message_id);
//!
//! session.close().await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Receiving
//!
//! Inbound requests (deliver_sm, data_sm, alert_notification, unbind) and
//! unsolicited responses go to the session's [`InboundHandler`]. The default
//! [`LoggingHandler`] logs them; [`ChannelHandler`] forwards them into a
//! channel:
//!
//! ```rust,no_run
//! use smpp_engine::client::{BindCredentials, ChannelHandler, InboundEvent, Session, SessionConfig};
//! use smpp_engine::pdu::{Pdu, PduBody};
//! use smpp_engine::datatypes::MessageIdResponse;
//!
//! # async fn example(stream: tokio::net::TcpStream) -> Result<(), Box<dyn std::error::Error>> {
//! let session = Session::new(stream, SessionConfig::default());
//! let (handler, mut events) = ChannelHandler::new();
//! session.set_inbound_handler(handler);
//! session.bind(&BindCredentials::receiver("system_id", "password")).await?;
//!
//! while let Some(event) = events.recv().await {
//!     if let InboundEvent::Request(pdu) = event {
//!         if let PduBody::DeliverSm(_) = pdu.body {
//!             let ack = PduBody::DeliverSmResp(MessageIdResponse::default());
//!             session.respond(Pdu::new(pdu.sequence_number, ack))?;
//!         }
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod builder;
pub mod config;
pub mod error;
pub mod keepalive;
mod pending;
pub mod sequence;
pub mod session;
pub mod state;
pub mod traits;
pub mod types;

// Re-export the main types for easy access
pub use builder::ClientBuilder;
pub use config::SessionConfig;
pub use error::{SmppError, SmppResult};
pub use keepalive::{KeepAliveConfig, KeepAliveManager, KeepAliveStatus};
pub use sequence::SequenceAllocator;
pub use session::{ResponseHandle, Session};
pub use state::{BindType, Notification, SessionEvent, SessionState, Transition};
pub use traits::{ChannelHandler, InboundEvent, InboundHandler, LoggingHandler, Transport};
pub use types::{BindCredentials, SmsMessage, SmsMessageBuilder, SmsOptions};
