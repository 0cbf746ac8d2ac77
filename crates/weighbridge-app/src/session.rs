//! Weighbridge session runtime
//!
//! One session owns one telemetry stream. Three activities run concurrently:
//!
//! - the ingest task, which frames the stream and publishes the latest weight
//! - the poll loop, which feeds that weight to the stability detector
//! - at most one transaction (identify, record, settle) at a time
//!
//! Operators talk to a running session through a cloneable [`SessionHandle`].

use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use serde::Serialize;
use tokio::io::AsyncRead;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, info, warn};

use weighbridge_domain::{
    LedgerOutcome, LedgerSummary, Material, MaterialCatalog, SentinelPolicy, StabilityDetector,
    StabilityThresholds, Ticket, TicketLedger, VehicleIdentifier, VisitCapture,
};
use weighbridge_telemetry::{pump, LatestWeight, StreamEnd, StreamEndReason, TelemetryFramer};
use weighbridge_types::{Identification, Result};

const EVENT_CAPACITY: usize = 256;

/// Runtime parameters of a session
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSettings {
    pub thresholds: StabilityThresholds,
    pub poll_interval: Duration,
    /// Cooldown after a visit is booked, before the slot frees up
    pub settle_delay: Duration,
    pub identification_timeout: Duration,
    pub sentinel_policy: SentinelPolicy,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            thresholds: StabilityThresholds::default(),
            poll_interval: Duration::from_millis(200),
            settle_delay: Duration::from_millis(1500),
            identification_timeout: Duration::from_secs(15),
            sentinel_policy: SentinelPolicy::default(),
        }
    }
}

/// What started a transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Trigger {
    /// The stability detector fired
    Automatic,
    /// Force capture from the operator
    Manual,
}

/// Notifications published to subscribers
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SessionEvent {
    Stable {
        weight: f64,
    },
    TransactionStarted {
        trigger: Trigger,
        weight: f64,
    },
    Identified {
        identification: Identification,
        weight: f64,
    },
    TicketOpened {
        ticket: Ticket,
    },
    TicketClosed {
        ticket: Ticket,
    },
    TicketVoided {
        ticket: Ticket,
    },
    MaterialSelected {
        material: Material,
    },
    CaptureSkipped {
        reason: String,
    },
    StreamEnded {
        end: StreamEnd,
    },
}

/// Final state handed back when [`Session::run`] returns
#[derive(Debug, Clone, Serialize)]
pub struct SessionReport {
    pub stream_end: StreamEnd,
    /// Newest first
    pub tickets: Vec<Ticket>,
    pub summary: LedgerSummary,
}

#[derive(Debug)]
enum Control {
    ForceCapture,
    Shutdown,
}

/// State shared between the poll loop, transactions and handles
struct Shared {
    latest: LatestWeight,
    ledger: RwLock<TicketLedger>,
    catalog: MaterialCatalog,
    material: RwLock<Material>,
    events: broadcast::Sender<SessionEvent>,
}

impl Shared {
    fn emit(&self, event: SessionEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }
}

/// Cloneable operator access to a session
#[derive(Clone)]
pub struct SessionHandle {
    shared: Arc<Shared>,
    control: mpsc::UnboundedSender<Control>,
}

impl SessionHandle {
    /// Latest published weight in kg
    pub fn current_weight(&self) -> f64 {
        self.shared.latest.get()
    }

    /// All tickets, newest first
    pub fn tickets(&self) -> Vec<Ticket> {
        self.shared.ledger.read().tickets().into_iter().cloned().collect()
    }

    pub fn ticket(&self, id: &str) -> Option<Ticket> {
        self.shared.ledger.read().get(id).cloned()
    }

    pub fn summary(&self) -> LedgerSummary {
        self.shared.ledger.read().summary()
    }

    pub fn materials(&self) -> &MaterialCatalog {
        &self.shared.catalog
    }

    pub fn selected_material(&self) -> Material {
        self.shared.material.read().clone()
    }

    /// Change the material applied to tickets opened from now on
    pub fn select_material(&self, id: &str) -> Result<Material> {
        let material = self.shared.catalog.require(id)?.clone();
        *self.shared.material.write() = material.clone();
        info!(material = %material.id, price_per_kg = material.price_per_kg, "Material selected");
        self.shared.emit(SessionEvent::MaterialSelected {
            material: material.clone(),
        });
        Ok(material)
    }

    pub fn void_ticket(&self, id: &str) -> Result<Ticket> {
        let ticket = self.shared.ledger.write().void_ticket(id)?;
        self.shared.emit(SessionEvent::TicketVoided {
            ticket: ticket.clone(),
        });
        Ok(ticket)
    }

    /// Request a transaction now, bypassing the detector.
    ///
    /// Returns `false` once the session has stopped.
    pub fn force_capture(&self) -> bool {
        self.control.send(Control::ForceCapture).is_ok()
    }

    /// Stop reading the stream and finish the session
    pub fn shutdown(&self) -> bool {
        self.control.send(Control::Shutdown).is_ok()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.shared.events.subscribe()
    }
}

/// Holds the single in-flight transaction
#[derive(Default)]
struct TransactionSlot {
    task: Option<JoinHandle<()>>,
}

impl TransactionSlot {
    fn is_busy(&mut self) -> bool {
        if self.task.as_ref().is_some_and(|task| task.is_finished()) {
            self.task = None;
        }
        self.task.is_some()
    }

    fn occupy(&mut self, task: JoinHandle<()>) {
        self.task = Some(task);
    }

    /// Wait up to `grace` for the running transaction, then abort it
    async fn drain(&mut self, grace: Duration) {
        let Some(mut task) = self.task.take() else {
            return;
        };
        match time::timeout(grace, &mut task).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(error = %e, "Transaction task failed"),
            Err(_) => {
                warn!(grace_ms = grace.as_millis() as u64, "Transaction still running, aborting");
                task.abort();
            }
        }
    }
}

enum LoopExit {
    Ended(StreamEnd),
    Shutdown,
}

/// A weighbridge session over one telemetry stream
pub struct Session<I: VehicleIdentifier> {
    settings: SessionSettings,
    identifier: Arc<I>,
    shared: Arc<Shared>,
    control_tx: mpsc::UnboundedSender<Control>,
    control_rx: mpsc::UnboundedReceiver<Control>,
}

impl<I: VehicleIdentifier> Session<I> {
    /// `material_id` selects the starting material; `None` takes the
    /// catalog's first entry.
    pub fn new(
        settings: SessionSettings,
        catalog: MaterialCatalog,
        material_id: Option<&str>,
        identifier: I,
    ) -> Result<Self> {
        let material = match material_id {
            Some(id) => catalog.require(id)?.clone(),
            None => catalog.first().clone(),
        };
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let (control_tx, control_rx) = mpsc::unbounded_channel();

        let shared = Arc::new(Shared {
            latest: LatestWeight::new(),
            ledger: RwLock::new(TicketLedger::new(settings.sentinel_policy)),
            catalog,
            material: RwLock::new(material),
            events,
        });

        Ok(Self {
            settings,
            identifier: Arc::new(identifier),
            shared,
            control_tx,
            control_rx,
        })
    }

    pub fn handle(&self) -> SessionHandle {
        SessionHandle {
            shared: Arc::clone(&self.shared),
            control: self.control_tx.clone(),
        }
    }

    /// Drive the session until the stream ends or a handle shuts it down.
    ///
    /// After the stream ends the detector is reset and polling stops, so a
    /// frozen last weight can never trigger another transaction. A running
    /// transaction gets `identification_timeout + settle_delay` to finish.
    pub async fn run<R>(self, reader: R) -> SessionReport
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let Session {
            settings,
            identifier,
            shared,
            control_tx,
            mut control_rx,
        } = self;
        // Handles may all be gone; the session still runs to the end of the stream
        let _keep_control_open = control_tx;

        let (stop_tx, stop_rx) = oneshot::channel::<()>();
        let mut ingest = tokio::spawn(ingest(reader, Arc::clone(&shared), stop_rx));

        let mut detector = StabilityDetector::new(settings.thresholds);
        let mut slot = TransactionSlot::default();
        let mut ticker = time::interval(settings.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!(
            poll_ms = settings.poll_interval.as_millis() as u64,
            entry = settings.thresholds.entry,
            departure = settings.thresholds.departure,
            ticks = settings.thresholds.ticks,
            "Session started"
        );

        let exit = loop {
            tokio::select! {
                joined = &mut ingest => {
                    break LoopExit::Ended(ingest_result(joined));
                }
                _ = ticker.tick() => {
                    let in_flight = slot.is_busy();
                    if let Some(event) = detector.tick(shared.latest.get(), in_flight) {
                        shared.emit(SessionEvent::Stable { weight: event.weight });
                        start_transaction(&mut slot, &shared, &identifier, &settings, Trigger::Automatic);
                    }
                }
                Some(control) = control_rx.recv() => match control {
                    Control::ForceCapture => {
                        if slot.is_busy() {
                            debug!("Force capture ignored, transaction in flight");
                            shared.emit(SessionEvent::CaptureSkipped {
                                reason: "transaction in flight".to_string(),
                            });
                        } else {
                            start_transaction(&mut slot, &shared, &identifier, &settings, Trigger::Manual);
                            // The manual capture is this visit; wait for departure
                            detector.mark_fired();
                        }
                    }
                    Control::Shutdown => break LoopExit::Shutdown,
                },
            }
        };

        let stream_end = match exit {
            LoopExit::Ended(end) => end,
            LoopExit::Shutdown => {
                let _ = stop_tx.send(());
                ingest_result(ingest.await)
            }
        };

        detector.reset();
        info!(reason = %stream_end.reason, lines = stream_end.stats.lines_parsed, "Telemetry stream ended");
        shared.emit(SessionEvent::StreamEnded {
            end: stream_end.clone(),
        });

        slot.drain(settings.identification_timeout + settings.settle_delay)
            .await;

        let ledger = shared.ledger.read();
        let tickets = ledger.tickets().into_iter().cloned().collect();
        let summary = ledger.summary();
        drop(ledger);

        SessionReport {
            stream_end,
            tickets,
            summary,
        }
    }
}

async fn ingest<R>(reader: R, shared: Arc<Shared>, stop: oneshot::Receiver<()>) -> StreamEnd
where
    R: AsyncRead + Unpin + Send + 'static,
{
    let mut framer = TelemetryFramer::new();
    let finished = tokio::select! {
        end = pump(reader, &mut framer, |sample| shared.latest.publish(&sample)) => Some(end),
        _ = stop => None,
    };
    match finished {
        Some(end) => end,
        None => StreamEnd {
            reason: StreamEndReason::Stopped,
            stats: framer.stats(),
            discarded_tail: framer.finish(),
        },
    }
}

fn ingest_result(joined: std::result::Result<StreamEnd, tokio::task::JoinError>) -> StreamEnd {
    joined.unwrap_or_else(|e| StreamEnd {
        reason: StreamEndReason::Failed(e.to_string()),
        stats: Default::default(),
        discarded_tail: 0,
    })
}

fn start_transaction<I: VehicleIdentifier>(
    slot: &mut TransactionSlot,
    shared: &Arc<Shared>,
    identifier: &Arc<I>,
    settings: &SessionSettings,
    trigger: Trigger,
) {
    let task = tokio::spawn(transaction(
        Arc::clone(shared),
        Arc::clone(identifier),
        settings.clone(),
        trigger,
    ));
    slot.occupy(task);
}

async fn transaction<I: VehicleIdentifier>(
    shared: Arc<Shared>,
    identifier: Arc<I>,
    settings: SessionSettings,
    trigger: Trigger,
) {
    let trigger_weight = shared.latest.get();
    info!(?trigger, weight = trigger_weight, "Transaction started");
    shared.emit(SessionEvent::TransactionStarted {
        trigger,
        weight: trigger_weight,
    });

    let identification =
        match time::timeout(settings.identification_timeout, identifier.identify()).await {
            Ok(Ok(identification)) => identification,
            Ok(Err(e)) => {
                warn!(error = %e, "Identification failed, booking for manual check");
                Identification::manual_check()
            }
            Err(_) => {
                warn!(
                    timeout_ms = settings.identification_timeout.as_millis() as u64,
                    "Identification timed out, booking for manual check"
                );
                Identification::manual_check()
            }
        };

    // Identification takes seconds; book what the deck reads now
    let weight = shared.latest.get();
    shared.emit(SessionEvent::Identified {
        identification: identification.clone(),
        weight,
    });

    let material = shared.material.read().clone();
    let mut visit = VisitCapture::new(identification.identifier, weight);
    visit.snapshot_digest = identification.snapshot_digest;

    let outcome = shared.ledger.write().record_visit(visit, &material);
    match outcome {
        Ok(LedgerOutcome::Opened(ticket)) => shared.emit(SessionEvent::TicketOpened { ticket }),
        Ok(LedgerOutcome::Closed(ticket)) => shared.emit(SessionEvent::TicketClosed { ticket }),
        Err(e) => warn!(error = %e, "Visit not booked"),
    }

    time::sleep(settings.settle_delay).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::collections::VecDeque;
    use std::future::Future;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::io::{AsyncWriteExt, DuplexStream};
    use weighbridge_domain::TicketStatus;
    use weighbridge_types::{IdentificationError, SENTINEL_MANUAL_CHECK};

    /// Replies in order, then `UNKNOWN`
    struct ScriptedIdentifier {
        replies: Mutex<VecDeque<std::result::Result<Identification, IdentificationError>>>,
        delay: Duration,
        calls: Arc<AtomicUsize>,
    }

    impl ScriptedIdentifier {
        fn new(
            delay: Duration,
            replies: Vec<std::result::Result<Identification, IdentificationError>>,
        ) -> Self {
            Self {
                replies: Mutex::new(replies.into()),
                delay,
                calls: Arc::new(AtomicUsize::new(0)),
            }
        }

        fn plates(delay: Duration, plates: &[&str]) -> Self {
            Self::new(
                delay,
                plates.iter().map(|p| Ok(Identification::new(*p, 0.9))).collect(),
            )
        }
    }

    impl VehicleIdentifier for ScriptedIdentifier {
        fn identify(
            &self,
        ) -> impl Future<Output = std::result::Result<Identification, IdentificationError>> + Send
        {
            async move {
                self.calls.fetch_add(1, Ordering::SeqCst);
                time::sleep(self.delay).await;
                let reply = self.replies.lock().pop_front();
                reply.unwrap_or_else(|| Ok(Identification::unknown()))
            }
        }
    }

    fn start(
        identifier: ScriptedIdentifier,
        settings: SessionSettings,
    ) -> (SessionHandle, DuplexStream, JoinHandle<SessionReport>) {
        let session = Session::new(settings, MaterialCatalog::builtin(), Some("mixed"), identifier)
            .unwrap();
        let handle = session.handle();
        let (writer, reader) = tokio::io::duplex(1024);
        let run = tokio::spawn(session.run(reader));
        (handle, writer, run)
    }

    async fn send(writer: &mut DuplexStream, kg: i64) {
        writer
            .write_all(format!("ST,GS,+{:>7} kg\r\n", kg).as_bytes())
            .await
            .unwrap();
    }

    async fn wait(ms: u64) {
        time::sleep(Duration::from_millis(ms)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_inbound_then_outbound_completes_ticket() {
        let identifier = ScriptedIdentifier::plates(Duration::from_millis(300), &["ABC123", "ABC123"]);
        let (handle, mut writer, run) = start(identifier, SessionSettings::default());

        send(&mut writer, 12_000).await;
        wait(5_000).await;
        let tickets = handle.tickets();
        assert_eq!(tickets.len(), 1);
        assert_eq!(tickets[0].status(), TicketStatus::Open);
        assert_eq!(tickets[0].vehicle_identifier(), "ABC123");

        send(&mut writer, 0).await;
        wait(1_000).await;
        send(&mut writer, 4_000).await;
        wait(5_000).await;
        drop(writer);

        let report = run.await.unwrap();
        assert_eq!(report.stream_end.reason, StreamEndReason::Eof);
        assert_eq!(report.tickets.len(), 1);
        let ticket = &report.tickets[0];
        assert_eq!(ticket.status(), TicketStatus::Completed);
        assert!((ticket.net_weight().unwrap() - 8000.0).abs() < 0.01);
        assert!((ticket.total_cost().unwrap() - 1200.0).abs() < 0.01);
        assert_eq!(report.summary.completed, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_one_transaction_per_stable_period() {
        let identifier = ScriptedIdentifier::plates(Duration::from_millis(300), &["XYZ9"]);
        let calls = Arc::clone(&identifier.calls);
        let (handle, mut writer, run) = start(identifier, SessionSettings::default());

        send(&mut writer, 15_000).await;
        wait(20_000).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(handle.tickets().len(), 1);

        drop(writer);
        run.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_force_capture_skipped_while_in_flight() {
        let identifier = ScriptedIdentifier::plates(Duration::from_secs(5), &["SLOW1"]);
        let calls = Arc::clone(&identifier.calls);
        let (handle, mut writer, run) = start(identifier, SessionSettings::default());
        let mut events = handle.subscribe();

        send(&mut writer, 9_000).await;
        wait(3_000).await;
        assert!(handle.force_capture());
        wait(100).await;

        let mut skipped = false;
        while let Ok(event) = events.try_recv() {
            if matches!(event, SessionEvent::CaptureSkipped { .. }) {
                skipped = true;
            }
        }
        assert!(skipped);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        drop(writer);
        run.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_force_capture_when_idle() {
        let identifier = ScriptedIdentifier::plates(Duration::from_millis(100), &["MAN1"]);
        let (handle, mut writer, run) = start(identifier, SessionSettings::default());
        let mut events = handle.subscribe();

        // Below the entry threshold: the detector never fires
        send(&mut writer, 300).await;
        wait(1_000).await;
        assert!(handle.force_capture());
        wait(500).await;

        let tickets = handle.tickets();
        assert_eq!(tickets.len(), 1);
        assert!((tickets[0].inbound().weight - 300.0).abs() < 0.01);

        let mut manual = false;
        while let Ok(event) = events.try_recv() {
            if let SessionEvent::TransactionStarted { trigger, .. } = event {
                manual = trigger == Trigger::Manual;
            }
        }
        assert!(manual);

        drop(writer);
        run.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_manual_capture_counts_as_the_visit() {
        let identifier = ScriptedIdentifier::plates(Duration::from_millis(300), &["ABC123", "ABC123"]);
        let calls = Arc::clone(&identifier.calls);
        let (handle, mut writer, run) = start(identifier, SessionSettings::default());

        send(&mut writer, 12_000).await;
        wait(500).await;
        assert!(handle.force_capture());
        // Truck stays on the deck well past the stability window
        wait(10_000).await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        let tickets = handle.tickets();
        assert_eq!(tickets.len(), 1);
        assert_eq!(tickets[0].status(), TicketStatus::Open);

        // Departure re-arms the detector for the return leg
        send(&mut writer, 0).await;
        wait(1_000).await;
        send(&mut writer, 4_000).await;
        wait(5_000).await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        let tickets = handle.tickets();
        assert_eq!(tickets.len(), 1);
        assert_eq!(tickets[0].status(), TicketStatus::Completed);
        assert!((tickets[0].net_weight().unwrap() - 8000.0).abs() < 0.01);

        drop(writer);
        run.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_identification_failure_books_manual_check() {
        let identifier = ScriptedIdentifier::new(
            Duration::from_millis(100),
            vec![Err(IdentificationError::EmptySnapshot)],
        );
        let (handle, mut writer, run) = start(identifier, SessionSettings::default());

        send(&mut writer, 11_000).await;
        wait(5_000).await;
        let tickets = handle.tickets();
        assert_eq!(tickets.len(), 1);
        assert_eq!(tickets[0].vehicle_identifier(), SENTINEL_MANUAL_CHECK);

        drop(writer);
        run.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_identification_timeout_books_manual_check() {
        let identifier = ScriptedIdentifier::plates(Duration::from_secs(60), &["TOO-LATE"]);
        let settings = SessionSettings {
            identification_timeout: Duration::from_secs(2),
            ..SessionSettings::default()
        };
        let (handle, mut writer, run) = start(identifier, settings);

        send(&mut writer, 11_000).await;
        wait(6_000).await;
        let tickets = handle.tickets();
        assert_eq!(tickets.len(), 1);
        assert_eq!(tickets[0].vehicle_identifier(), SENTINEL_MANUAL_CHECK);

        drop(writer);
        run.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_weight_read_after_identification() {
        let identifier = ScriptedIdentifier::plates(Duration::from_secs(2), &["SETTLE"]);
        let (handle, mut writer, run) = start(identifier, SessionSettings::default());

        // Fires around t=2s, identification completes around t=4s
        send(&mut writer, 12_000).await;
        wait(3_000).await;
        send(&mut writer, 12_100).await;
        wait(3_000).await;

        let tickets = handle.tickets();
        assert_eq!(tickets.len(), 1);
        assert!((tickets[0].inbound().weight - 12_100.0).abs() < 0.01);

        drop(writer);
        run.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_stream_end_drains_in_flight_transaction() {
        let identifier = ScriptedIdentifier::plates(Duration::from_secs(1), &["LAST1"]);
        let (handle, mut writer, run) = start(identifier, SessionSettings::default());
        let mut events = handle.subscribe();

        send(&mut writer, 12_000).await;
        wait(2_500).await;
        drop(writer);

        let report = run.await.unwrap();
        assert_eq!(report.tickets.len(), 1);
        assert_eq!(report.tickets[0].vehicle_identifier(), "LAST1");

        let mut ended = false;
        while let Ok(event) = events.try_recv() {
            if matches!(event, SessionEvent::StreamEnded { .. }) {
                ended = true;
            }
        }
        assert!(ended);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_stops_session() {
        let identifier = ScriptedIdentifier::plates(Duration::from_millis(100), &[]);
        let (handle, mut writer, run) = start(identifier, SessionSettings::default());

        send(&mut writer, 50).await;
        wait(500).await;
        assert!(handle.shutdown());

        let report = run.await.unwrap();
        assert_eq!(report.stream_end.reason, StreamEndReason::Stopped);
        assert_eq!(report.stream_end.stats.lines_parsed, 1);
        assert!(report.tickets.is_empty());
        assert!(!handle.force_capture());
        drop(writer);
    }

    #[tokio::test(start_paused = true)]
    async fn test_material_selection_applies_to_next_ticket() {
        let identifier = ScriptedIdentifier::plates(Duration::from_millis(100), &["MET1"]);
        let (handle, mut writer, run) = start(identifier, SessionSettings::default());

        assert!(handle.select_material("unobtainium").is_err());
        let metal = handle.select_material("metal").unwrap();
        assert!(metal.is_payout());

        send(&mut writer, 7_000).await;
        wait(5_000).await;
        let tickets = handle.tickets();
        assert_eq!(tickets[0].material_id(), "metal");

        let voided = handle.void_ticket(tickets[0].id()).unwrap();
        assert_eq!(voided.status(), TicketStatus::Void);
        assert!(handle.void_ticket(tickets[0].id()).is_err());
        assert_eq!(handle.summary().void, 1);

        drop(writer);
        run.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_event_order_for_automatic_visit() {
        let identifier = ScriptedIdentifier::plates(Duration::from_millis(100), &["ORD1"]);
        let (handle, mut writer, run) = start(identifier, SessionSettings::default());
        let mut events = handle.subscribe();

        send(&mut writer, 10_000).await;
        wait(5_000).await;
        drop(writer);
        run.await.unwrap();

        let mut kinds = Vec::new();
        while let Ok(event) = events.try_recv() {
            kinds.push(match event {
                SessionEvent::Stable { .. } => "stable",
                SessionEvent::TransactionStarted { .. } => "started",
                SessionEvent::Identified { .. } => "identified",
                SessionEvent::TicketOpened { .. } => "opened",
                SessionEvent::StreamEnded { .. } => "ended",
                _ => "other",
            });
        }
        assert_eq!(kinds, vec!["stable", "started", "identified", "opened", "ended"]);
    }

    #[tokio::test]
    async fn test_unknown_starting_material_rejected() {
        let identifier = ScriptedIdentifier::plates(Duration::ZERO, &[]);
        let result = Session::new(
            SessionSettings::default(),
            MaterialCatalog::builtin(),
            Some("gold"),
            identifier,
        );
        assert!(result.is_err());
    }
}
