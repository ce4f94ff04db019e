// ABOUTME: Long-running transceiver that sends periodic messages and acknowledges delivery receipts
// ABOUTME: Shows inbound handling through ChannelHandler, automatic keep-alive and state watching

//! # Long-Running SMPP Transceiver
//!
//! Binds as transceiver and then, until the run duration elapses or the
//! session drops:
//!
//! * acknowledges every deliver_sm and logs delivery receipts
//! * optionally sends a message every `--sms-interval` seconds
//! * lets the session keep the link alive with enquire_link
//!
//! ## Usage
//!
//! ```bash
//! cargo run --example transceiver -- --system-id test --password secret
//!
//! cargo run --example transceiver -- \
//!   --system-id test --password secret \
//!   --to 447700900123 --from ACME \
//!   --sms-interval 120 --keep-alive-interval 60 --max-failures 3
//! ```

use argh::FromArgs;
use smpp_engine::client::{
    BindCredentials, ChannelHandler, InboundEvent, Session, SessionConfig, SmsMessage,
};
use smpp_engine::datatypes::MessageIdResponse;
use smpp_engine::pdu::{Pdu, PduBody};
use smpp_engine::segmentation::InboundPart;
use std::time::Duration;
use tokio::time::{interval, sleep};
use tracing::{Level, debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

/// Long-running SMPP transceiver with keep-alive
#[derive(FromArgs)]
struct CliArgs {
    /// enable debug logging
    #[argh(switch, short = 'd')]
    debugging: bool,

    /// the system id
    #[argh(option)]
    system_id: Option<String>,

    /// the password
    #[argh(option)]
    password: Option<String>,

    /// the hostname or IP address of the SMSC (default: localhost)
    #[argh(option)]
    host: Option<String>,

    /// the port to use when connecting to the SMSC (default: 2775)
    #[argh(option, short = 'p')]
    port: Option<u16>,

    /// idle seconds before an enquire_link is sent (default: 30)
    #[argh(option)]
    keep_alive_interval: Option<u64>,

    /// seconds to wait for enquire_link_resp (default: 10)
    #[argh(option)]
    keep_alive_timeout: Option<u64>,

    /// unanswered enquire_links before giving up (default: 1)
    #[argh(option)]
    max_failures: Option<u32>,

    /// how long to run in seconds (default: 300)
    #[argh(option)]
    run_duration: Option<u64>,

    /// interval between SMS sends in seconds (default: 60)
    #[argh(option)]
    sms_interval: Option<u64>,

    /// the recipient telephone number (no SMS sent if not provided)
    #[argh(option, short = 't')]
    to: Option<String>,

    /// the telephone number that the message will be from
    #[argh(option, short = 'f')]
    from: Option<String>,
}

#[tokio::main]
async fn main() -> smpp_engine::Result<()> {
    let cli_args: CliArgs = argh::from_env();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(if cli_args.debugging {
            Level::DEBUG
        } else {
            Level::INFO
        })
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let host = cli_args.host.unwrap_or_else(|| "localhost".to_owned());
    let port = cli_args.port.unwrap_or(2775);
    let run_duration = Duration::from_secs(cli_args.run_duration.unwrap_or(300));
    let sms_interval = Duration::from_secs(cli_args.sms_interval.unwrap_or(60));

    let mut config = SessionConfig::default().with_enquire_link_interval(Duration::from_secs(
        cli_args.keep_alive_interval.unwrap_or(30),
    ));
    if let Some(timeout) = cli_args.keep_alive_timeout {
        config = config.with_enquire_link_timeout(Duration::from_secs(timeout));
    }
    if let Some(max_failures) = cli_args.max_failures {
        config = config.with_max_keepalive_failures(max_failures);
    }

    info!("Connecting to {host}:{port}");
    let stream = tokio::net::TcpStream::connect((host.as_str(), port)).await?;
    let session = Session::new(stream, config);

    // Install the handler before binding so no deliver_sm is missed
    let (handler, mut events) = ChannelHandler::new();
    session.set_inbound_handler(handler);

    let credentials = BindCredentials::transceiver(
        cli_args.system_id.unwrap_or_default(),
        cli_args.password.unwrap_or_default(),
    );
    session
        .bind(&credentials)
        .await
        .inspect_err(|e| error!("Bind failed: {e}"))?;
    info!("Bound as {}", session.state());

    let send_messages = cli_args.to.is_some() && cli_args.from.is_some();
    let mut sms_timer = interval(sms_interval);
    let mut state_changes = session.state_changes();
    let deadline = sleep(run_duration);
    tokio::pin!(deadline);

    let mut message_count = 0u32;
    let mut receipt_count = 0u32;

    loop {
        tokio::select! {
            _ = &mut deadline => {
                info!("Run duration elapsed, shutting down");
                break;
            }

            changed = state_changes.changed() => {
                if changed.is_err() || !state_changes.borrow().is_bound() {
                    error!("Session is no longer bound");
                    break;
                }
            }

            Some(event) = events.recv() => {
                if handle_event(&session, event) {
                    receipt_count += 1;
                }
            }

            _ = sms_timer.tick(), if send_messages => {
                if let (Some(to), Some(from)) = (&cli_args.to, &cli_args.from) {
                    message_count += 1;
                    let text = format!("Test message #{message_count} from transceiver");
                    let sms = SmsMessage::builder()
                        .to(to)
                        .from(from)
                        .text(text)
                        .with_delivery_receipt()
                        .build()?;

                    // Submit in the background so inbound events keep flowing
                    let session = session.clone();
                    tokio::spawn(async move {
                        match session.submit(&sms).await {
                            Ok(ids) => info!(
                                message = message_count,
                                id = %ids[0].message_id,
                                "Message sent"
                            ),
                            Err(e) => error!(message = message_count, "Failed to send: {e}"),
                        }
                    });
                }
            }
        }
    }

    let status = session.keepalive_status();
    if let Err(e) = session.close().await {
        warn!("Close failed: {e}");
    }

    info!("Final statistics:");
    info!("  Enquire_links sent: {}", status.total_pings);
    info!("  Enquire_links answered: {}", status.total_pongs);
    info!("  Messages sent: {}", message_count);
    info!("  Delivery receipts: {}", receipt_count);
    Ok(())
}

/// Acknowledge inbound requests; true when the event was a delivery receipt
fn handle_event(session: &Session, event: InboundEvent) -> bool {
    let pdu = match event {
        InboundEvent::Request(pdu) => pdu,
        InboundEvent::Unsolicited(pdu) => {
            warn!(sequence = pdu.sequence_number, "Late response ignored");
            return false;
        }
        InboundEvent::Undecodable { header, error } => {
            warn!(sequence = header.sequence_number, %error, "Undecodable PDU");
            if !header.command_id.is_response() {
                let nack = Pdu::generic_nack(header.sequence_number, error.to_command_status());
                let _ = session.respond(nack);
            }
            return false;
        }
    };

    let sequence = pdu.sequence_number;
    let (reply, is_receipt) = match pdu.body {
        PduBody::DeliverSm(deliver) => {
            let is_receipt = match deliver.delivery_receipt() {
                Some(receipt) => {
                    info!(
                        id = %receipt.message_id,
                        state = ?receipt.state,
                        "Delivery receipt"
                    );
                    true
                }
                None => {
                    match InboundPart::from_message(&deliver) {
                        Ok(Some(part)) => info!(
                            reference = part.reference,
                            part = part.sequence,
                            total = part.total,
                            "Message part received"
                        ),
                        _ => info!(from = %deliver.source_addr.addr, "Message received"),
                    }
                    false
                }
            };
            (
                Pdu::new(sequence, PduBody::DeliverSmResp(MessageIdResponse::default())),
                is_receipt,
            )
        }
        PduBody::DataSm(_) => (
            Pdu::new(sequence, PduBody::DataSmResp(MessageIdResponse::default())),
            false,
        ),
        PduBody::Unbind => (Pdu::new(sequence, PduBody::UnbindResp), false),
        other => {
            debug!(command_id = ?other.command_id(), "Ignoring request");
            return false;
        }
    };

    if let Err(e) = session.respond(reply) {
        warn!("Could not acknowledge PDU {sequence}: {e}");
    }
    is_receipt
}
