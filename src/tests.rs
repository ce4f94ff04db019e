//! Session tests against a scripted SMSC on the far end of an in-memory pipe

use crate::client::{
    BindCredentials, BindType, ChannelHandler, InboundEvent, InboundHandler, Session,
    SessionConfig, SessionState, SmppError, SmppResult, SmsMessage,
};
use crate::connection::Connection;
use crate::datatypes::{
    Address, BindResponse, CommandId, CommandStatus, DeliverSm, MessageIdResponse, MessageType,
    SubmitSm, TagRegistry,
};
use crate::pdu::{Pdu, PduBody};
use crate::segmentation::SegmentationMethod;
use std::collections::HashSet;
use std::time::Duration;
use tokio::io::DuplexStream;
use tokio::time::timeout;

const WAIT: Duration = Duration::from_secs(2);

/// The SMSC side of a test session
struct Smsc {
    connection: Connection<DuplexStream>,
}

impl Smsc {
    async fn recv(&mut self) -> Pdu {
        let frame = timeout(WAIT, self.connection.read_frame())
            .await
            .expect("no frame from the session")
            .unwrap()
            .expect("session closed the connection");
        frame.decode(TagRegistry::standard()).unwrap()
    }

    async fn send(&mut self, pdu: Pdu) {
        self.connection.write_pdu(&pdu).await.unwrap();
    }

    async fn send_raw(&mut self, bytes: &[u8]) {
        self.connection.write_frame(bytes).await.unwrap();
    }

    async fn expect_closed(&mut self) {
        let next = timeout(WAIT, self.connection.read_frame())
            .await
            .expect("session did not close the connection")
            .unwrap();
        assert!(next.is_none(), "unexpected frame {next:?}");
    }

    async fn answer_bind(&mut self, status: CommandStatus) -> Pdu {
        let request = self.recv().await;
        let body = match request.command_id() {
            CommandId::BindTransmitter => PduBody::BindTransmitterResp(BindResponse::new("SMSC")),
            CommandId::BindReceiver => PduBody::BindReceiverResp(BindResponse::new("SMSC")),
            CommandId::BindTransceiver => PduBody::BindTransceiverResp(BindResponse::new("SMSC")),
            other => panic!("expected a bind, got {other:?}"),
        };
        self.send(Pdu::with_status(request.sequence_number, status, body))
            .await;
        request
    }
}

fn quiet() -> SessionConfig {
    SessionConfig::default().with_keepalive(false)
}

fn connect(config: SessionConfig) -> (Session, Smsc) {
    let (client, server) = tokio::io::duplex(64 * 1024);
    let session = Session::new(client, config);
    let smsc = Smsc {
        connection: Connection::new(server),
    };
    (session, smsc)
}

async fn bound(config: SessionConfig) -> (Session, Smsc) {
    let (session, mut smsc) = connect(config);
    let bind = tokio::spawn({
        let session = session.clone();
        async move {
            session
                .bind(&BindCredentials::transceiver("esme", "secret"))
                .await
        }
    });
    smsc.answer_bind(CommandStatus::Ok).await;
    bind.await.unwrap().unwrap();
    (session, smsc)
}

fn submit_body() -> PduBody {
    PduBody::SubmitSm(Box::new(SubmitSm::new(
        Address::alphanumeric("ACME"),
        Address::international("447700900123"),
        "hello",
    )))
}

#[tokio::test]
async fn bind_publishes_bound_state() {
    let (session, mut smsc) = connect(quiet());
    let mut changes = session.state_changes();
    assert_eq!(session.state(), SessionState::Unbound);

    let bind = tokio::spawn({
        let session = session.clone();
        async move {
            let credentials = BindCredentials::transmitter("esme", "secret").with_system_type("VMA");
            session.bind(&credentials).await
        }
    });

    let request = smsc.answer_bind(CommandStatus::Ok).await;
    let PduBody::BindTransmitter(bind_body) = request.body else {
        panic!("expected bind_transmitter");
    };
    assert_eq!(bind_body.system_id, "esme");
    assert_eq!(bind_body.password, "secret");
    assert_eq!(bind_body.system_type, "VMA");

    let response = bind.await.unwrap().unwrap();
    assert_eq!(response.system_id, "SMSC");
    assert_eq!(session.state(), SessionState::Bound(BindType::Transmitter));

    changes.changed().await.unwrap();
    assert_eq!(*changes.borrow(), SessionState::Bound(BindType::Transmitter));
}

#[tokio::test]
async fn rejected_bind_stays_unbound() {
    let (session, mut smsc) = connect(quiet());
    let bind = tokio::spawn({
        let session = session.clone();
        async move {
            session
                .bind(&BindCredentials::receiver("esme", "wrong"))
                .await
        }
    });

    smsc.answer_bind(CommandStatus::InvalidPassword).await;
    let result = bind.await.unwrap();
    assert!(matches!(
        result,
        Err(SmppError::RemoteError(CommandStatus::InvalidPassword))
    ));
    assert_eq!(session.state(), SessionState::Unbound);
    assert!(!session.is_closed());
}

#[tokio::test]
async fn send_while_unbound_touches_nothing() {
    let (session, mut smsc) = connect(quiet());

    let result = session.request(submit_body()).await;
    assert!(matches!(
        result,
        Err(SmppError::InvalidSessionState {
            operation: CommandId::SubmitSm,
            state: SessionState::Unbound,
        })
    ));
    assert_eq!(session.pending_requests(), 0);

    // The first frame the SMSC sees is the bind, so nothing else went out
    let bind = tokio::spawn({
        let session = session.clone();
        async move {
            session
                .bind(&BindCredentials::transmitter("esme", "secret"))
                .await
        }
    });
    let request = smsc.answer_bind(CommandStatus::Ok).await;
    assert_eq!(request.command_id(), CommandId::BindTransmitter);
    assert_eq!(request.sequence_number, 1);
    bind.await.unwrap().unwrap();
}

#[tokio::test]
async fn bind_while_bound_is_rejected() {
    let (session, _smsc) = bound(quiet()).await;
    let result = session
        .bind(&BindCredentials::transmitter("esme", "secret"))
        .await;
    assert!(matches!(
        result,
        Err(SmppError::InvalidSessionState {
            operation: CommandId::BindTransmitter,
            ..
        })
    ));
}

#[tokio::test]
async fn responses_go_through_respond_only() {
    let (session, _smsc) = bound(quiet()).await;
    assert!(matches!(
        session.send(PduBody::EnquireLinkResp).await,
        Err(SmppError::InvalidData(_))
    ));
    assert!(matches!(
        session.respond(Pdu::new(9, PduBody::EnquireLink)),
        Err(SmppError::InvalidData(_))
    ));
}

#[tokio::test]
async fn disconnect_fails_pending_requests() {
    let (session, mut smsc) = bound(quiet()).await;
    let mut changes = session.state_changes();

    let request = tokio::spawn({
        let session = session.clone();
        async move { session.request(submit_body()).await }
    });
    assert_eq!(smsc.recv().await.command_id(), CommandId::SubmitSm);
    drop(smsc);

    assert!(matches!(
        request.await.unwrap(),
        Err(SmppError::SessionClosed)
    ));
    changes
        .wait_for(|state| *state == SessionState::Unbound)
        .await
        .unwrap();
    assert!(session.is_closed());
    assert_eq!(session.pending_requests(), 0);
    assert!(matches!(
        session.request(submit_body()).await,
        Err(SmppError::SessionClosed)
    ));
}

#[tokio::test]
async fn error_status_and_mismatched_responses() {
    let (session, mut smsc) = bound(quiet()).await;

    let first = session.send(submit_body()).await.unwrap();
    let second = session.send(submit_body()).await.unwrap();
    let a = smsc.recv().await;
    let b = smsc.recv().await;
    assert_eq!(a.sequence_number, first.sequence_number());
    assert_eq!(b.sequence_number, second.sequence_number());

    smsc.send(Pdu::with_status(
        a.sequence_number,
        CommandStatus::ThrottlingError,
        PduBody::SubmitSmResp(MessageIdResponse::default()),
    ))
    .await;
    smsc.send(Pdu::new(b.sequence_number, PduBody::EnquireLinkResp))
        .await;

    assert!(matches!(
        first.await,
        Err(SmppError::RemoteError(CommandStatus::ThrottlingError))
    ));
    assert!(matches!(
        second.await,
        Err(SmppError::UnexpectedPdu {
            expected: CommandId::SubmitSmResp,
            actual: CommandId::EnquireLinkResp,
        })
    ));
}

#[tokio::test]
async fn late_response_is_unsolicited() {
    let (session, mut smsc) = bound(quiet().with_response_timeout(Duration::from_millis(100))).await;
    let (handler, mut events) = ChannelHandler::new();
    session.set_inbound_handler(handler);

    let handle = session.send(submit_body()).await.unwrap();
    let request = smsc.recv().await;
    assert!(matches!(handle.await, Err(SmppError::Timeout)));
    assert_eq!(session.pending_requests(), 0);

    smsc.send(Pdu::new(
        request.sequence_number,
        PduBody::SubmitSmResp(MessageIdResponse::new("late")),
    ))
    .await;

    let event = timeout(WAIT, events.recv()).await.unwrap().unwrap();
    let InboundEvent::Unsolicited(pdu) = event else {
        panic!("expected an unsolicited response, got {event:?}");
    };
    assert_eq!(pdu.sequence_number, request.sequence_number);
    assert!(session.state().is_bound());
}

#[tokio::test]
async fn concurrent_requests_get_distinct_sequences() {
    let (session, mut smsc) = bound(quiet()).await;

    let mut tasks = Vec::new();
    for _ in 0..10 {
        let session = session.clone();
        tasks.push(tokio::spawn(
            async move { session.request(PduBody::EnquireLink).await },
        ));
    }

    let mut requests = Vec::new();
    for _ in 0..10 {
        requests.push(smsc.recv().await);
    }
    let sequences: HashSet<u32> = requests.iter().map(|pdu| pdu.sequence_number).collect();
    assert_eq!(sequences.len(), 10);

    // Answer out of order
    for request in requests.iter().rev() {
        smsc.send(Pdu::new(request.sequence_number, PduBody::EnquireLinkResp))
            .await;
    }

    let mut answered = HashSet::new();
    for task in tasks {
        let response = task.await.unwrap().unwrap();
        assert_eq!(response.body, PduBody::EnquireLinkResp);
        answered.insert(response.sequence_number);
    }
    assert_eq!(answered, sequences);
}

#[tokio::test]
async fn in_flight_limit_blocks_send() {
    let (session, mut smsc) = bound(quiet().with_max_in_flight(1)).await;

    let first = session.send(PduBody::EnquireLink).await.unwrap();
    assert!(
        timeout(Duration::from_millis(100), session.send(PduBody::EnquireLink))
            .await
            .is_err()
    );

    let request = smsc.recv().await;
    smsc.send(Pdu::new(request.sequence_number, PduBody::EnquireLinkResp))
        .await;
    first.await.unwrap();

    let second = timeout(WAIT, session.send(PduBody::EnquireLink))
        .await
        .unwrap()
        .unwrap();
    assert_ne!(second.sequence_number(), request.sequence_number);
}

#[tokio::test]
async fn peer_enquire_link_is_answered() {
    let (_session, mut smsc) = bound(quiet()).await;

    smsc.send(Pdu::new(77, PduBody::EnquireLink)).await;
    let response = smsc.recv().await;
    assert_eq!(response.body, PduBody::EnquireLinkResp);
    assert_eq!(response.sequence_number, 77);
    assert_eq!(response.command_status, CommandStatus::Ok);
}

#[tokio::test]
async fn peer_unbind_closes_session() {
    let (session, mut smsc) = bound(quiet()).await;
    let mut changes = session.state_changes();

    smsc.send(Pdu::new(5, PduBody::Unbind)).await;
    let response = smsc.recv().await;
    assert_eq!(response.body, PduBody::UnbindResp);
    assert_eq!(response.sequence_number, 5);

    smsc.expect_closed().await;
    changes
        .wait_for(|state| *state == SessionState::Unbound)
        .await
        .unwrap();
    assert!(session.is_closed());
}

#[tokio::test]
async fn unknown_and_undecodable_requests_are_nacked() {
    let (_session, mut smsc) = bound(quiet()).await;

    // command_id 0x00000099 is not an SMPP operation
    smsc.send_raw(&[
        0x00, 0x00, 0x00, 0x10, 0x00, 0x00, 0x00, 0x99, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        0x09,
    ])
    .await;
    let nack = smsc.recv().await;
    assert_eq!(nack.body, PduBody::GenericNack);
    assert_eq!(nack.sequence_number, 9);
    assert_eq!(nack.command_status, CommandStatus::InvalidCommandId);

    // deliver_sm whose service_type never terminates
    smsc.send_raw(&[
        0x00, 0x00, 0x00, 0x13, 0x00, 0x00, 0x00, 0x05, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        0x0A, b'C', b'M', b'T',
    ])
    .await;
    let nack = smsc.recv().await;
    assert_eq!(nack.body, PduBody::GenericNack);
    assert_eq!(nack.sequence_number, 10);
    assert_ne!(nack.command_status, CommandStatus::Ok);

    // The session survives both
    smsc.send(Pdu::new(11, PduBody::EnquireLink)).await;
    assert_eq!(smsc.recv().await.body, PduBody::EnquireLinkResp);
}

#[tokio::test]
async fn delivery_receipt_reaches_channel_handler() {
    let (session, mut smsc) = bound(quiet()).await;
    let (handler, mut events) = ChannelHandler::new();
    session.set_inbound_handler(handler);

    let mut receipt = DeliverSm::new(
        Address::international("447700900123"),
        Address::alphanumeric("ACME"),
        "id:253092914522667372 sub:001 dlvrd:001 submit date:2410181200 done date:2410181201 stat:DELIVRD err:000 text:hello",
    );
    receipt.esm_class = receipt
        .esm_class
        .with_message_type(MessageType::DeliveryReceipt);
    receipt
        .optional
        .set_receipted_message_id("253092914522667372");
    smsc.send(Pdu::new(31, PduBody::DeliverSm(Box::new(receipt))))
        .await;

    let event = timeout(WAIT, events.recv()).await.unwrap().unwrap();
    let InboundEvent::Request(pdu) = event else {
        panic!("expected a request, got {event:?}");
    };
    let PduBody::DeliverSm(deliver) = &pdu.body else {
        panic!("expected deliver_sm");
    };
    assert_eq!(
        deliver.optional.receipted_message_id(),
        Some("253092914522667372")
    );
    assert_eq!(
        deliver.delivery_receipt().map(|receipt| receipt.message_id),
        Some("253092914522667372".to_string())
    );

    session
        .respond(Pdu::new(
            pdu.sequence_number,
            PduBody::DeliverSmResp(MessageIdResponse::default()),
        ))
        .unwrap();
    let ack = smsc.recv().await;
    assert_eq!(ack.command_id(), CommandId::DeliverSmResp);
    assert_eq!(ack.sequence_number, 31);
}

#[tokio::test]
async fn submit_splits_long_text_with_udh() {
    let (session, mut smsc) = bound(quiet()).await;
    let message = SmsMessage::new("447700900123", "ACME", "a".repeat(200));

    let submit = tokio::spawn({
        let session = session.clone();
        async move { session.submit(&message).await }
    });

    let mut reference = None;
    for (index, expected_len) in [(1u8, 153usize), (2, 47)] {
        let request = smsc.recv().await;
        let PduBody::SubmitSm(sm) = &request.body else {
            panic!("expected submit_sm");
        };
        assert!(sm.esm_class.has_udhi());
        assert_eq!(sm.dest_addr.addr, "447700900123");

        let udh = &sm.short_message[..6];
        assert_eq!(&udh[..3], &[0x05, 0x00, 0x03]);
        assert_eq!(*reference.get_or_insert(udh[3]), udh[3]);
        assert_eq!(udh[4], 2);
        assert_eq!(udh[5], index);
        assert_eq!(sm.short_message.len() - 6, expected_len);

        smsc.send(Pdu::new(
            request.sequence_number,
            PduBody::SubmitSmResp(MessageIdResponse::new(format!("msg-{index}"))),
        ))
        .await;
    }

    let ids: Vec<String> = submit
        .await
        .unwrap()
        .unwrap()
        .into_iter()
        .map(|response| response.message_id)
        .collect();
    assert_eq!(ids, ["msg-1", "msg-2"]);
}

#[tokio::test]
async fn submit_with_sar_sets_parameters() {
    let config = quiet().with_segmentation_method(SegmentationMethod::Sar);
    let (session, mut smsc) = bound(config).await;
    let message = SmsMessage::new("447700900123", "ACME", "b".repeat(161));

    let submit = tokio::spawn({
        let session = session.clone();
        async move { session.submit(&message).await }
    });

    for sequence in 1..=2u8 {
        let request = smsc.recv().await;
        let PduBody::SubmitSm(sm) = &request.body else {
            panic!("expected submit_sm");
        };
        assert!(!sm.esm_class.has_udhi());
        let sar = sm.optional.sar().unwrap().unwrap();
        assert_eq!(sar.total_segments, 2);
        assert_eq!(sar.segment_seqnum, sequence);

        smsc.send(Pdu::new(
            request.sequence_number,
            PduBody::SubmitSmResp(MessageIdResponse::new("ok")),
        ))
        .await;
    }
    assert_eq!(submit.await.unwrap().unwrap().len(), 2);
}

#[tokio::test]
async fn short_message_is_sent_whole() {
    let (session, mut smsc) = bound(quiet()).await;
    let message = SmsMessage::new("447700900123", "ACME", "Hello!");

    let submit = tokio::spawn({
        let session = session.clone();
        async move { session.submit(&message).await }
    });

    let request = smsc.recv().await;
    let PduBody::SubmitSm(sm) = &request.body else {
        panic!("expected submit_sm");
    };
    assert!(!sm.esm_class.has_udhi());
    assert_eq!(&sm.short_message[..], b"Hello!");
    smsc.send(Pdu::new(
        request.sequence_number,
        PduBody::SubmitSmResp(MessageIdResponse::new("only")),
    ))
    .await;

    assert_eq!(submit.await.unwrap().unwrap()[0].message_id, "only");
}

#[tokio::test]
async fn idle_link_is_pinged() {
    let config = SessionConfig::default()
        .with_enquire_link_interval(Duration::from_millis(50))
        .with_enquire_link_timeout(Duration::from_millis(500));
    let (session, mut smsc) = bound(config).await;

    let ping = smsc.recv().await;
    assert_eq!(ping.body, PduBody::EnquireLink);
    smsc.send(Pdu::new(ping.sequence_number, PduBody::EnquireLinkResp))
        .await;

    timeout(WAIT, async {
        while session.keepalive_status().total_pongs == 0 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap();
    assert!(session.state().is_bound());
    assert_eq!(session.keepalive_status().consecutive_failures, 0);
}

#[tokio::test]
async fn unanswered_ping_tears_down() {
    let config = SessionConfig::default()
        .with_enquire_link_interval(Duration::from_millis(50))
        .with_enquire_link_timeout(Duration::from_millis(100));
    let (session, mut smsc) = bound(config).await;
    let mut changes = session.state_changes();

    assert_eq!(smsc.recv().await.body, PduBody::EnquireLink);
    smsc.expect_closed().await;

    changes
        .wait_for(|state| *state == SessionState::Unbound)
        .await
        .unwrap();
    assert!(session.is_closed());
    assert_eq!(session.keepalive_status().consecutive_failures, 1);
}

#[tokio::test]
async fn close_unbinds_first() {
    let (session, mut smsc) = bound(quiet()).await;

    let close = tokio::spawn({
        let session = session.clone();
        async move { session.close().await }
    });

    let unbind = smsc.recv().await;
    assert_eq!(unbind.body, PduBody::Unbind);
    smsc.send(Pdu::new(unbind.sequence_number, PduBody::UnbindResp))
        .await;
    smsc.expect_closed().await;

    timeout(WAIT, close).await.unwrap().unwrap().unwrap();
    assert_eq!(session.state(), SessionState::Unbound);
    assert!(session.is_closed());
}

#[tokio::test]
async fn close_while_unbound_just_disconnects() {
    let (session, mut smsc) = connect(quiet());
    timeout(WAIT, session.close()).await.unwrap().unwrap();
    smsc.expect_closed().await;
    assert!(session.is_closed());
}

#[tokio::test]
async fn dropping_the_last_handle_closes_the_session() {
    let config = SessionConfig::default()
        .with_enquire_link_interval(Duration::from_millis(100))
        .with_enquire_link_timeout(Duration::from_millis(500));
    let (session, mut smsc) = bound(config).await;

    // A surviving clone keeps the session alive
    let clone = session.clone();
    drop(session);
    let request = tokio::spawn({
        let clone = clone.clone();
        async move { clone.enquire_link().await }
    });
    let enquire = smsc.recv().await;
    assert_eq!(enquire.body, PduBody::EnquireLink);
    smsc.send(Pdu::new(enquire.sequence_number, PduBody::EnquireLinkResp))
        .await;
    request.await.unwrap().unwrap();

    // Without any handle the connection closes and no keep-alive follows
    drop(clone);
    smsc.expect_closed().await;
}

#[tokio::test]
async fn dropped_response_handle_keeps_its_slot() {
    let (session, mut smsc) = bound(quiet().with_max_in_flight(1)).await;

    let first = session.send(PduBody::EnquireLink).await.unwrap();
    drop(first);
    assert_eq!(session.pending_requests(), 1);
    assert!(
        timeout(Duration::from_millis(100), session.send(PduBody::EnquireLink))
            .await
            .is_err()
    );

    // The answer frees the slot even though nobody waits for it
    let request = smsc.recv().await;
    smsc.send(Pdu::new(request.sequence_number, PduBody::EnquireLinkResp))
        .await;
    let second = timeout(WAIT, session.send(PduBody::EnquireLink))
        .await
        .unwrap()
        .unwrap();
    assert_ne!(second.sequence_number(), request.sequence_number);
    assert_eq!(session.pending_requests(), 1);
}

/// Answers a peer unbind and closes the session from the reader task
struct CloseOnUnbind {
    done: tokio::sync::mpsc::UnboundedSender<SmppResult<()>>,
}

impl InboundHandler for CloseOnUnbind {
    fn handle(&self, event: InboundEvent, session: &Session) {
        let InboundEvent::Request(pdu) = event else {
            return;
        };
        if pdu.body != PduBody::Unbind {
            return;
        }
        session
            .respond(Pdu::new(pdu.sequence_number, PduBody::UnbindResp))
            .unwrap();
        let closed = tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(session.close())
        });
        let _ = self.done.send(closed);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn close_from_an_inbound_handler_returns() {
    let (session, mut smsc) = bound(quiet()).await;
    let (done, mut closed) = tokio::sync::mpsc::unbounded_channel();
    session.set_inbound_handler(CloseOnUnbind { done });

    smsc.send(Pdu::new(12, PduBody::Unbind)).await;
    assert_eq!(smsc.recv().await.body, PduBody::UnbindResp);
    smsc.expect_closed().await;

    let result = timeout(WAIT, closed.recv()).await.unwrap().unwrap();
    assert!(result.is_ok());
    assert!(session.is_closed());
}
