// ABOUTME: Asynchronous SMPP session over any byte stream transport
// ABOUTME: Runs reader, writer and timer tasks that correlate responses, answer keep-alives and enforce state

use crate::client::config::SessionConfig;
use crate::client::error::{SmppError, SmppResult};
use crate::client::keepalive::{KeepAliveManager, KeepAliveStatus};
use crate::client::pending::{PendingMap, PendingRequest};
use crate::client::sequence::SequenceAllocator;
use crate::client::state::{BindType, Notification, SessionEvent, SessionState};
use crate::client::traits::{InboundEvent, InboundHandler, LoggingHandler, Transport};
use crate::client::types::{BindCredentials, SmsMessage};
use crate::connection::{Connection, FrameReader, FrameWriter};
use crate::datatypes::{BindResponse, CommandId, MessageIdResponse};
use crate::frame::Frame;
use crate::pdu::{Pdu, PduBody};
use crate::segmentation::{ReferenceGenerator, split_message};
use bytes::Bytes;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, Weak};
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::io::{ReadHalf, WriteHalf};
use tokio::sync::{OwnedSemaphorePermit, Semaphore, mpsc, oneshot, watch};
use tokio::task;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, trace, warn};

const MIN_TIMER_TICK: Duration = Duration::from_millis(10);
const MAX_TIMER_TICK: Duration = Duration::from_secs(1);

/// Work for the writer task, processed in order
#[derive(Debug)]
enum Outbound {
    Frame(Bytes),
    /// Flush what came before, then shut the transport down
    Close,
}

/// Everything transitions touch, behind one lock
#[derive(Debug)]
struct SessionCore {
    state: SessionState,
    closed: bool,
    sequence: SequenceAllocator,
    pending: PendingMap,
    keepalive: KeepAliveManager,
}

struct Shared {
    /// Back reference to the user handles, for passing a [`Session`] to the
    /// inbound handler
    owner: Weak<Owner>,
    config: SessionConfig,
    core: Mutex<SessionCore>,
    outbound: mpsc::UnboundedSender<Outbound>,
    state_tx: watch::Sender<SessionState>,
    shutdown_tx: watch::Sender<bool>,
    in_flight: Arc<Semaphore>,
    handler: RwLock<Arc<dyn InboundHandler>>,
    references: ReferenceGenerator,
    /// Reader, writer and timer, in that order
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

/// Shared by every user-facing clone; the session tasks only hold [`Shared`]
struct Owner {
    shared: Arc<Shared>,
}

impl Drop for Owner {
    fn drop(&mut self) {
        if !self.shared.core().closed {
            info!("Last session handle dropped, closing");
            self.shared.handle_event(SessionEvent::Closed);
        }
    }
}

/// An SMPP session from the ESME side.
///
/// Cloning is cheap; all clones drive the same session. The session owns
/// three tasks: a reader that decodes frames in wire order, a writer fed
/// through an unbounded queue, and a timer that sweeps timed-out requests
/// and sends enquire_link when the link is idle. [`Session::close`] unbinds
/// and stops them. Dropping the last clone stops them too, without an
/// unbind.
///
/// # Example
///
/// ```rust,no_run
/// use smpp_engine::client::{BindCredentials, Session, SessionConfig, SmsMessage};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let stream = tokio::net::TcpStream::connect("localhost:2775").await?;
/// let session = Session::new(stream, SessionConfig::default());
///
/// session.bind(&BindCredentials::transmitter("system_id", "password")).await?;
/// let ids = session.submit(&SmsMessage::new("447700900123", "ACME", "Hello!")).await?;
/// println!("Accepted as {}", ids[0].message_id);
///
/// session.close().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Session {
    owner: Arc<Owner>,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("state", &self.state())
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// Resolves to the response for one request.
///
/// The request keeps its `max_in_flight` slot until it is answered, times
/// out or the session closes, whether or not this handle is still around.
/// Dropping the handle only discards the outcome.
#[derive(Debug)]
pub struct ResponseHandle {
    sequence_number: u32,
    rx: oneshot::Receiver<SmppResult<Pdu>>,
}

impl ResponseHandle {
    pub fn sequence_number(&self) -> u32 {
        self.sequence_number
    }
}

impl Future for ResponseHandle {
    type Output = SmppResult<Pdu>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|outcome| outcome.unwrap_or_else(|_| Err(SmppError::SessionClosed)))
    }
}

impl Session {
    /// Start a session over `transport`. Must be called from within a
    /// tokio runtime.
    pub fn new<T: Transport>(transport: T, config: SessionConfig) -> Session {
        let (reader, writer) = Connection::new(transport).into_split();
        let (outbound, outbound_rx) = mpsc::unbounded_channel();
        let (state_tx, _) = watch::channel(SessionState::Unbound);
        let (shutdown_tx, _) = watch::channel(false);

        let core = SessionCore {
            state: SessionState::Unbound,
            closed: false,
            sequence: SequenceAllocator::new(),
            pending: PendingMap::default(),
            keepalive: KeepAliveManager::new(config.keepalive()),
        };

        let owner = Arc::new_cyclic(|owner| Owner {
            shared: Arc::new(Shared {
                owner: owner.clone(),
                in_flight: Arc::new(Semaphore::new(config.max_in_flight.max(1))),
                config,
                core: Mutex::new(core),
                outbound,
                state_tx,
                shutdown_tx,
                handler: RwLock::new(Arc::new(LoggingHandler)),
                references: ReferenceGenerator::default(),
                tasks: Mutex::new(Vec::new()),
            }),
        });

        let shared = &owner.shared;
        let tasks = vec![
            tokio::spawn(shared.clone().read_loop(reader)),
            tokio::spawn(shared.clone().write_loop(writer, outbound_rx)),
            tokio::spawn(shared.clone().timer_loop()),
        ];
        *shared.tasks.lock().unwrap_or_else(PoisonError::into_inner) = tasks;

        Session { owner }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.shared().config
    }

    pub fn state(&self) -> SessionState {
        *self.shared().state_tx.borrow()
    }

    /// Every state change, in order. Changes that happened before
    /// subscribing are not replayed.
    pub fn state_changes(&self) -> watch::Receiver<SessionState> {
        self.shared().state_tx.subscribe()
    }

    /// Whether the transport has been torn down
    pub fn is_closed(&self) -> bool {
        self.shared().core().closed
    }

    /// Requests currently awaiting a response
    pub fn pending_requests(&self) -> usize {
        self.shared().core().pending.len()
    }

    pub fn keepalive_status(&self) -> KeepAliveStatus {
        self.shared().core().keepalive.status()
    }

    /// Replace the handler for inbound requests and unsolicited responses.
    /// The default is [`LoggingHandler`].
    pub fn set_inbound_handler(&self, handler: impl InboundHandler) {
        *self
            .shared()
            .handler
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Arc::new(handler);
    }

    /// Bind with `credentials`; the session is bound when this returns `Ok`.
    pub async fn bind(&self, credentials: &BindCredentials) -> SmppResult<BindResponse> {
        info!(
            system_id = %credentials.system_id,
            bind_type = %credentials.bind_type,
            "Binding"
        );
        let body = credentials.bind_type.request_body(credentials.to_bind());
        let expected = credentials
            .bind_type
            .request_id()
            .response_id()
            .unwrap_or(CommandId::GenericNack);

        let pdu = match self.request(body).await {
            Ok(pdu) => pdu,
            Err(error) => {
                warn!(%error, "Bind failed");
                return Err(error);
            }
        };

        match pdu.body {
            PduBody::BindTransmitterResp(response)
            | PduBody::BindReceiverResp(response)
            | PduBody::BindTransceiverResp(response) => {
                info!(smsc = %response.system_id, "Bound");
                Ok(response)
            }
            other => Err(SmppError::UnexpectedPdu {
                expected,
                actual: other.command_id(),
            }),
        }
    }

    /// Queue a request and return a handle that resolves to its response.
    ///
    /// Waits only for an in-flight slot. Fails without touching the
    /// transport when the session state does not allow `body`.
    pub async fn send(&self, body: PduBody) -> SmppResult<ResponseHandle> {
        let shared = self.shared();
        let command_id = body.command_id();
        Shared::check_request(&shared.core(), command_id)?;

        let permit = shared
            .in_flight
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| SmppError::SessionClosed)?;

        shared.register(body, permit, shared.config.response_timeout)
    }

    /// Send a request and wait for its response
    pub async fn request(&self, body: PduBody) -> SmppResult<Pdu> {
        self.send(body).await?.await
    }

    /// Write a PDU that expects no response: an answer to an inbound
    /// request (keeping its sequence number), or an alert_notification.
    ///
    /// Answering a peer `unbind` with `unbind_resp` closes the session once
    /// the response is flushed.
    pub fn respond(&self, pdu: Pdu) -> SmppResult<()> {
        self.shared().respond(pdu)
    }

    /// Split `message` with the configured method and data coding and
    /// submit every segment in order.
    ///
    /// Stops at the first failed segment; segments already accepted are not
    /// recalled.
    pub async fn submit(&self, message: &SmsMessage) -> SmppResult<Vec<MessageIdResponse>> {
        let shared = self.shared();
        let coding = message
            .options
            .data_coding
            .unwrap_or(shared.config.default_data_coding);
        let method = shared.config.segmentation_method;
        let reference = shared.references.next(method);

        let segments = split_message(&message.text, coding, method, reference)?;
        let template = message.to_submit_sm(coding);

        let mut responses = Vec::with_capacity(segments.len());
        for segment in &segments {
            let mut submit = template.clone();
            segment.apply_to(&mut submit);

            let pdu = self.request(PduBody::SubmitSm(Box::new(submit))).await?;
            match pdu.body {
                PduBody::SubmitSmResp(response) => responses.push(response),
                other => {
                    return Err(SmppError::UnexpectedPdu {
                        expected: CommandId::SubmitSmResp,
                        actual: other.command_id(),
                    });
                }
            }
        }

        debug!(
            to = %message.to,
            segments = responses.len(),
            "Message submitted"
        );
        Ok(responses)
    }

    pub async fn enquire_link(&self) -> SmppResult<()> {
        self.request(PduBody::EnquireLink).await?;
        Ok(())
    }

    /// Unbind; the transport is closed once the SMSC answers
    pub async fn unbind(&self) -> SmppResult<()> {
        info!("Unbinding");
        self.request(PduBody::Unbind).await?;
        Ok(())
    }

    /// Unbind if bound, then close the transport and wait for the session
    /// tasks to finish.
    ///
    /// From an [`InboundHandler`] this runs on the reader task, which can
    /// neither read the `unbind_resp` nor be joined: the unbind is skipped
    /// and the reader stops after the handler returns.
    pub async fn close(&self) -> SmppResult<()> {
        let shared = self.shared();
        let tasks = std::mem::take(
            &mut *shared
                .tasks
                .lock()
                .unwrap_or_else(PoisonError::into_inner),
        );
        let current = task::try_id();
        let on_reader = current.is_some() && tasks.first().map(JoinHandle::id) == current;

        if self.state().is_bound() {
            if on_reader {
                warn!("Closing from the reader task, skipping unbind");
            } else if let Err(error) = self.unbind().await {
                warn!(%error, "Unbind failed while closing");
            }
        }
        shared.handle_event(SessionEvent::Closed);

        for handle in tasks {
            if Some(handle.id()) == current {
                continue;
            }
            if let Err(error) = handle.await {
                debug!(%error, "Session task ended abnormally");
            }
        }
        Ok(())
    }

    fn shared(&self) -> &Shared {
        &self.owner.shared
    }
}

impl Shared {
    fn core(&self) -> MutexGuard<'_, SessionCore> {
        self.core.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// A user handle, unless every one has been dropped
    fn session(&self) -> Option<Session> {
        self.owner.upgrade().map(|owner| Session { owner })
    }

    fn check_request(core: &SessionCore, command_id: CommandId) -> SmppResult<()> {
        if core.closed {
            return Err(SmppError::SessionClosed);
        }
        if command_id.is_response() || command_id.response_id().is_none() {
            return Err(SmppError::InvalidData(format!(
                "{command_id:?} is not answered, use respond"
            )));
        }
        if !core.state.permits(command_id) {
            return Err(SmppError::InvalidSessionState {
                operation: command_id,
                state: core.state,
            });
        }
        Ok(())
    }

    /// Allocate a sequence number, register the waiter and queue the frame.
    /// The permit stays with the pending entry.
    fn register(
        &self,
        body: PduBody,
        permit: OwnedSemaphorePermit,
        timeout: Duration,
    ) -> SmppResult<ResponseHandle> {
        let command_id = body.command_id();
        let mut guard = self.core();
        let core = &mut *guard;

        // State may have changed while waiting for a slot
        Self::check_request(core, command_id)?;

        let sequence = core.sequence.allocate(|n| core.pending.contains(n));
        let bytes = Pdu::new(sequence, body).encode()?;

        let (request, rx) = PendingRequest::new(command_id, Instant::now() + timeout, permit);
        core.pending.insert(sequence, request);
        if self.enqueue(bytes).is_err() {
            core.pending.take(sequence);
            return Err(SmppError::SessionClosed);
        }
        debug!(sequence, ?command_id, "Request sent");

        Ok(ResponseHandle {
            sequence_number: sequence,
            rx,
        })
    }

    fn respond(&self, pdu: Pdu) -> SmppResult<()> {
        let command_id = pdu.command_id();
        if !command_id.is_response() && command_id.response_id().is_some() {
            return Err(SmppError::InvalidData(format!(
                "{command_id:?} expects a response, use send"
            )));
        }

        let bytes = pdu.encode()?;
        if self.core().closed {
            return Err(SmppError::SessionClosed);
        }
        self.enqueue(bytes)?;
        trace!(sequence = pdu.sequence_number, ?command_id, "Response queued");

        if command_id == CommandId::UnbindResp {
            info!("Peer unbind answered, closing session");
            self.handle_event(SessionEvent::UnbindCompleted);
        }
        Ok(())
    }

    fn enqueue(&self, bytes: Bytes) -> SmppResult<()> {
        self.outbound
            .send(Outbound::Frame(bytes))
            .map_err(|_| SmppError::SessionClosed)
    }

    /// Apply `event` and carry out the resulting notifications in order
    fn handle_event(&self, event: SessionEvent) {
        let (transition, mut failed, first_teardown) = {
            let mut core = self.core();
            let transition = core.state.apply(event);
            core.state = transition.state;

            let failed = if transition.notifications.contains(&Notification::FailPending) {
                core.pending.drain()
            } else {
                Vec::new()
            };

            let tears_down = transition.notifications.contains(&Notification::TearDown);
            let first_teardown = tears_down && !core.closed;
            if tears_down {
                core.closed = true;
            }
            (transition, failed, first_teardown)
        };

        for notification in transition.notifications {
            match notification {
                Notification::FailPending => {
                    for (sequence, request) in failed.drain(..) {
                        debug!(sequence, command_id = ?request.command_id, "Failing pending request");
                        request.fail(SmppError::SessionClosed);
                    }
                }
                Notification::TearDown => {
                    if first_teardown {
                        info!(?event, "Closing session");
                    }
                    // The writer may already be gone
                    let _ = self.outbound.send(Outbound::Close);
                    self.in_flight.close();
                    self.shutdown_tx.send_replace(true);
                }
                Notification::StateChanged(state) => {
                    info!(%state, "Session state changed");
                    self.state_tx.send_replace(state);
                }
            }
        }
    }

    async fn read_loop<T: Transport>(self: Arc<Self>, mut reader: FrameReader<ReadHalf<T>>) {
        let mut shutdown = self.shutdown_tx.subscribe();
        loop {
            if *shutdown.borrow_and_update() {
                break;
            }
            let result = tokio::select! {
                _ = shutdown.changed() => break,
                result = reader.read_frame() => result,
            };

            match result {
                Ok(Some(frame)) => self.dispatch(frame),
                Ok(None) => {
                    info!("Peer closed the connection");
                    self.handle_event(SessionEvent::Disconnected);
                    break;
                }
                Err(error) => {
                    error!(%error, "Transport failed");
                    self.handle_event(SessionEvent::Disconnected);
                    break;
                }
            }
        }
        debug!("Reader stopped");
    }

    async fn write_loop<T: Transport>(
        self: Arc<Self>,
        mut writer: FrameWriter<WriteHalf<T>>,
        mut outbound: mpsc::UnboundedReceiver<Outbound>,
    ) {
        while let Some(message) = outbound.recv().await {
            match message {
                Outbound::Frame(bytes) => {
                    trace!(length = bytes.len(), "Writing frame");
                    if let Err(error) = writer.write_frame(&bytes).await {
                        error!(%error, "Write failed");
                        self.handle_event(SessionEvent::Disconnected);
                        break;
                    }
                }
                Outbound::Close => break,
            }
        }
        if let Err(error) = writer.shutdown().await {
            debug!(%error, "Transport shutdown failed");
        }
        debug!("Writer stopped");
    }

    async fn timer_loop(self: Arc<Self>) {
        let mut shutdown = self.shutdown_tx.subscribe();
        let mut ticker = tokio::time::interval(self.timer_tick());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            if *shutdown.borrow_and_update() {
                break;
            }
            tokio::select! {
                _ = shutdown.changed() => break,
                _ = ticker.tick() => {}
            }

            let now = Instant::now();
            let (expired, ping) = {
                let mut core = self.core();
                let expired = core.pending.expire(now);
                let ping =
                    !core.closed && core.state.is_bound() && core.keepalive.should_ping(now);
                (expired, ping)
            };

            for (sequence, request) in expired {
                warn!(sequence, command_id = ?request.command_id, "Request timed out");
                request.fail(SmppError::Timeout);
            }
            if ping {
                self.ping();
            }
        }
        debug!("Timer stopped");
    }

    /// Tick fine enough for the shortest configured timer
    fn timer_tick(&self) -> Duration {
        let config = &self.config;
        let mut shortest = config.response_timeout;
        if config.keepalive_enabled {
            shortest = shortest
                .min(config.enquire_link_interval)
                .min(config.enquire_link_timeout);
        }
        (shortest / 4).clamp(MIN_TIMER_TICK, MAX_TIMER_TICK)
    }

    /// Send a keep-alive enquire_link and track its outcome
    fn ping(self: &Arc<Self>) {
        let Ok(permit) = self.in_flight.clone().try_acquire_owned() else {
            debug!("All in-flight slots busy, skipping enquire_link");
            return;
        };

        let timeout = self.config.enquire_link_timeout;
        let handle = match self.register(PduBody::EnquireLink, permit, timeout) {
            Ok(handle) => handle,
            Err(error) => {
                debug!(%error, "Enquire_link not sent");
                return;
            }
        };
        self.core().keepalive.on_ping_sent();

        let shared = Arc::clone(self);
        tokio::spawn(async move {
            let outcome = handle.await;
            let expired = {
                let mut core = shared.core();
                match outcome {
                    Err(SmppError::SessionClosed) => false,
                    Err(SmppError::Timeout) => {
                        core.keepalive.on_ping_failure();
                        core.keepalive.is_connection_failed()
                    }
                    // Any answer proves the peer is alive
                    Ok(_) | Err(_) => {
                        core.keepalive.on_ping_success();
                        false
                    }
                }
            };
            if expired {
                error!("Keep-alive failed, closing session");
                shared.handle_event(SessionEvent::KeepaliveExpired);
            }
        });
    }

    fn dispatch(&self, frame: Frame) {
        let header = frame.header();
        trace!(
            sequence = header.sequence_number,
            command_id = ?header.command_id,
            length = header.command_length,
            "Frame received"
        );
        self.core().keepalive.on_traffic(Instant::now());

        match frame.decode(&self.config.tag_registry) {
            Ok(pdu) if pdu.is_response() => self.on_response(pdu),
            Ok(pdu) => self.on_request(pdu),
            Err(error) if error.is_fatal() => {
                error!(%error, "Fatal decode error");
                self.handle_event(SessionEvent::Disconnected);
            }
            Err(error) => {
                let waiter = if header.command_id.is_response() {
                    self.core().pending.take(header.sequence_number)
                } else {
                    None
                };
                match waiter {
                    Some(request) => request.fail(SmppError::Codec(error)),
                    None => self.deliver(InboundEvent::Undecodable { header, error }),
                }
            }
        }
    }

    fn on_response(&self, pdu: Pdu) {
        let waiter = self.core().pending.take(pdu.sequence_number);
        let Some(request) = waiter else {
            self.deliver(InboundEvent::Unsolicited(pdu));
            return;
        };

        // Transition before waking the waiter so it observes the new state
        let answered = request.command_id.response_id() == Some(pdu.command_id());
        match request.command_id {
            CommandId::Unbind => self.handle_event(SessionEvent::UnbindCompleted),
            id if id.is_bind() && answered && pdu.command_status.is_ok() => {
                if let Some(bind_type) = BindType::from_command_id(id) {
                    self.handle_event(SessionEvent::BindAccepted(bind_type));
                }
            }
            _ => {}
        }
        request.complete(pdu);
    }

    fn on_request(&self, pdu: Pdu) {
        if pdu.body == PduBody::EnquireLink {
            trace!(sequence = pdu.sequence_number, "Answering enquire_link");
            let response = Pdu::new(pdu.sequence_number, PduBody::EnquireLinkResp);
            if let Err(error) = self.respond(response) {
                debug!(%error, "Could not answer enquire_link");
            }
            return;
        }
        self.deliver(InboundEvent::Request(pdu));
    }

    fn deliver(&self, event: InboundEvent) {
        // Every handle is gone and the session is closing
        let Some(session) = self.session() else {
            trace!(?event, "No session handle left, event dropped");
            return;
        };
        let handler = self
            .handler
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        handler.handle(event, &session);
    }
}
