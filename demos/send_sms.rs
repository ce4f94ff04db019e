// ABOUTME: Example application that binds as transmitter and submits one possibly long SMS
// ABOUTME: Shows ClientBuilder, session configuration and per-segment message ids

use argh::FromArgs;
use smpp_engine::client::{BindCredentials, ClientBuilder, SessionConfig, SmsMessage};
use smpp_engine::encoding::preferred_coding;
use smpp_engine::segmentation::SegmentationMethod;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// Example application to show the simplest case of sending an SMS message
#[derive(FromArgs)]
struct CliArgs {
    /// whether or not to enable debugging
    #[argh(switch, short = 'd')]
    debugging: bool,

    /// the system id
    #[argh(option)]
    system_id: Option<String>,

    /// the password
    #[argh(option)]
    password: Option<String>,

    /// the hostname of IP address of the SMSC (default: localhost)
    #[argh(option)]
    host: Option<String>,

    /// the port to use when connecting to the SMSC (default: 2775)
    #[argh(option, short = 'p')]
    port: Option<u16>,

    /// split long messages with SAR parameters instead of a user data header
    #[argh(switch)]
    sar: bool,

    /// request a delivery receipt
    #[argh(switch, short = 'r')]
    receipt: bool,

    /// the message to send
    #[argh(option, short = 'm')]
    message: String,

    /// the recipient telephone number
    #[argh(option, short = 't')]
    to: String,

    /// the telephone number that the message will be from
    #[argh(option, short = 'f')]
    from: String,
}

#[tokio::main]
async fn main() -> smpp_engine::Result<()> {
    let cli_args: CliArgs = argh::from_env();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(if cli_args.debugging {
            Level::TRACE
        } else {
            Level::INFO
        })
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let host = cli_args.host.unwrap_or_else(|| "localhost".to_owned());
    let port = cli_args.port.unwrap_or(2775);
    let credentials = BindCredentials::transmitter(
        cli_args.system_id.unwrap_or_default(),
        cli_args.password.unwrap_or_default(),
    );

    let method = if cli_args.sar {
        SegmentationMethod::Sar
    } else {
        SegmentationMethod::Udh
    };
    let config = SessionConfig::default().with_segmentation_method(method);

    let session = ClientBuilder::new(config)
        .bind((host.as_str(), port), &credentials)
        .await
        .inspect_err(|e| eprintln!("Connection/bind failed: {e}"))?;
    println!("Connected and bound as {}", session.state());

    // GSM 03.38 when every character fits, UCS-2 otherwise
    let coding = preferred_coding(&cli_args.message);
    println!("Sending with data coding {coding:?}");
    let mut builder = SmsMessage::builder()
        .to(&cli_args.to)
        .from(&cli_args.from)
        .text(&cli_args.message)
        .data_coding(coding);
    if cli_args.receipt {
        builder = builder.with_delivery_receipt();
    }
    let sms = builder.build()?;

    let result = session.submit(&sms).await;

    // Clean shutdown either way
    if let Err(e) = session.close().await {
        eprintln!("Warning: close failed: {e}");
    }

    let responses = result.inspect_err(|e| eprintln!("Failed to send message: {e}"))?;
    for (index, response) in responses.iter().enumerate() {
        println!(
            "Segment {}/{} accepted, message ID: {}",
            index + 1,
            responses.len(),
            response.message_id
        );
    }
    Ok(())
}
