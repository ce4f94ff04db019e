//! SMPP v3.4 protocol engine.
//!
//! * [`codec`] and [`datatypes`] - wire primitives, PDU bodies and optional parameters
//! * [`pdu`] - complete PDUs with encode and decode
//! * [`frame`] and [`connection`] - framing over async byte streams
//! * [`encoding`] and [`segmentation`] - character sets and long message splitting
//! * [`client`] - an async ESME session with request correlation and keep-alive

mod macros;

pub mod client;
pub mod codec;
pub mod connection;
pub mod datatypes;
pub mod encoding;
pub mod frame;
pub mod pdu;
pub mod segmentation;

#[cfg(test)]
mod tests;

// Re-export codec types for direct access
pub use codec::{CodecError, Decodable, Encodable, MAX_PDU_SIZE, PduHeader};
pub use frame::Frame;
pub use pdu::{Pdu, PduBody};
pub use segmentation::{Segment, SegmentationMethod, split_message};

// Re-export the main client API for easy access
pub use client::{
    BindCredentials, ClientBuilder, Session, SessionConfig, SessionState, SmppError, SmppResult,
    SmsMessage,
};

/// Error returned by the demo binaries and other application glue.
///
/// Library functions return typed errors ([`CodecError`], [`SmppError`]);
/// this boxed form is for `main` functions that mix them with I/O and
/// argument errors.
pub type Error = Box<dyn std::error::Error + Send + Sync>;

/// A specialized `Result` type for application code.
///
/// # Examples
///
/// ## Sending a message
///
/// ```rust,no_run
/// use smpp_engine::{ClientBuilder, SmsMessage};
///
/// #[tokio::main]
/// async fn main() -> smpp_engine::Result<()> {
///     let session = ClientBuilder::transmitter("localhost:2775", "system_id", "password").await?;
///
///     let sms = SmsMessage::new("447700900123", "ACME", "Hello, World!");
///     let ids = session.submit(&sms).await?;
///     println!("Message sent with ID: {}", ids[0].message_id);
///
///     session.close().await?;
///     Ok(())
/// }
/// ```
///
/// ## Encoding a PDU by hand
///
/// ```rust
/// use smpp_engine::{Pdu, PduBody};
/// use smpp_engine::datatypes::TagRegistry;
///
/// # fn main() -> smpp_engine::Result<()> {
/// let bytes = Pdu::new(1, PduBody::EnquireLink).encode()?;
/// assert_eq!(bytes.len(), 16);
///
/// let decoded = Pdu::decode(&bytes, TagRegistry::standard())?;
/// assert_eq!(decoded.body, PduBody::EnquireLink);
/// # Ok(())
/// # }
/// ```
pub type Result<T> = std::result::Result<T, Error>;
