//! Scan orchestration engine
//!
//! Lifecycle wrapper around the store and its concurrent activities:
//! - frame producer (dedicated thread)
//! - decode worker, scan evaluator, trigger monitor (tokio tasks)
//! - presenter driver (tokio tasks)
//!
//! Outer layers see a read-only snapshot plus two commands: `reset()` and
//! `shutdown()`.

use super::decode_worker::{spawn_decode_worker, DecodeWorkerSettings};
use super::evaluator::{spawn_evaluator, Dispatcher};
use super::frame_queue::FrameQueue;
use super::ledger::LedgerTasks;
use super::presenter::PresenterHandle;
use super::producer::{spawn_producer, ProducerSettings};
use super::trigger::{spawn_trigger_monitor, TriggerSettings};
use crate::bridges::{Camera, Decoder, LedgerCommit, LedgerLookup, SignalPresenter, TriggerInput};
use crate::config::ControllerConfig;
use crate::error::{Error, Result};
use crate::session::{SessionPolicy, SessionSnapshot, SessionStore};
use sctrk_common::events::{EventBus, ScanEvent};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Event bus capacity (SSE clients lagging further than this skip events)
const EVENT_BUS_CAPACITY: usize = 256;

/// External collaborators driven by the engine
pub struct EngineBridges {
    pub camera: Arc<dyn Camera>,
    pub decoder: Arc<dyn Decoder>,
    pub lookup: Arc<dyn LedgerLookup>,
    pub commit: Arc<dyn LedgerCommit>,
    pub presenter: Arc<dyn SignalPresenter>,
    /// Physical trigger; None when resets only come through `reset()`
    pub trigger: Option<Arc<dyn TriggerInput>>,
}

/// Handles of the running activities
struct EngineTasks {
    producer: std::thread::JoinHandle<()>,
    decode_worker: JoinHandle<()>,
    evaluator: JoinHandle<()>,
    trigger: Option<JoinHandle<()>>,
}

impl EngineTasks {
    async fn join(self, timeout: Duration) {
        join_task("decode worker", self.decode_worker, timeout).await;
        join_task("scan evaluator", self.evaluator, timeout).await;
        if let Some(trigger) = self.trigger {
            join_task("trigger monitor", trigger, timeout).await;
        }

        let producer = self.producer;
        let joined = tokio::task::spawn_blocking(move || producer.join());
        match tokio::time::timeout(timeout, joined).await {
            Ok(Ok(Ok(()))) => debug!("Frame producer joined"),
            Ok(Ok(Err(_))) => warn!("Frame producer thread panicked"),
            Ok(Err(e)) => warn!("Failed to join frame producer: {}", e),
            Err(_) => warn!(
                "Frame producer did not stop within {}ms, detaching",
                timeout.as_millis()
            ),
        }
    }
}

async fn join_task(name: &str, handle: JoinHandle<()>, timeout: Duration) {
    match tokio::time::timeout(timeout, handle).await {
        Ok(Ok(())) => debug!("{} joined", name),
        Ok(Err(e)) => warn!("{} task failed: {}", name, e),
        Err(_) => warn!("{} did not stop within {}ms, detaching", name, timeout.as_millis()),
    }
}

/// Scan Orchestration Engine
pub struct ScanEngine {
    dispatcher: Arc<Dispatcher>,
    event_bus: EventBus,
    running: Arc<AtomicBool>,
    join_timeout: Duration,
    tasks: Mutex<Option<EngineTasks>>,
}

impl ScanEngine {
    /// Build the store and start every activity
    ///
    /// Must be called from within a Tokio runtime. The session starts `Idle`;
    /// scanning begins at the first reset.
    pub fn start(config: &ControllerConfig, bridges: EngineBridges) -> Result<Self> {
        let scanner = &config.scanner;
        let event_bus = EventBus::new(EVENT_BUS_CAPACITY);
        let running = Arc::new(AtomicBool::new(true));

        let store = Arc::new(SessionStore::new(
            config.route.destinations.clone(),
            SessionPolicy::from_config(scanner),
        ));

        let (outcome_tx, outcome_rx) = mpsc::unbounded_channel();
        let ledger = LedgerTasks::new(bridges.lookup, bridges.commit, config.ledger.timeout(), outcome_tx);
        let presenter = PresenterHandle::spawn(bridges.presenter, event_bus.clone());
        let dispatcher = Arc::new(Dispatcher::new(
            Arc::clone(&store),
            presenter,
            ledger,
            event_bus.clone(),
        ));

        let (frame_producer, frame_consumer) = FrameQueue::new(scanner.queue_capacity).split();

        let producer = spawn_producer(
            bridges.camera,
            Arc::clone(&store),
            frame_producer,
            ProducerSettings {
                skip_frames: scanner.skip_frames,
                empty_frame_retry: scanner.empty_frame_retry(),
            },
            Arc::clone(&running),
        )
        .map_err(|e| Error::Internal(format!("Failed to spawn frame producer: {}", e)))?;

        let decode_worker = spawn_decode_worker(
            bridges.decoder,
            Arc::clone(&store),
            frame_consumer,
            event_bus.clone(),
            DecodeWorkerSettings {
                idle_poll: scanner.idle_poll(),
                max_wait: scanner.evaluator_tick(),
            },
            Arc::clone(&running),
        );

        let evaluator = spawn_evaluator(
            Arc::clone(&dispatcher),
            outcome_rx,
            scanner.evaluator_tick(),
            Arc::clone(&running),
        );

        let trigger = bridges.trigger.map(|input| {
            let dispatcher = Arc::clone(&dispatcher);
            spawn_trigger_monitor(
                input,
                TriggerSettings {
                    poll_interval: Duration::from_millis(config.trigger.poll_interval_ms),
                    release_poll: Duration::from_millis(config.trigger.release_poll_ms),
                    settle: Duration::from_millis(config.trigger.settle_ms),
                },
                Arc::clone(&running),
                move || dispatcher.reset(),
            )
        });

        info!(
            "Scan engine started (destinations: {})",
            config.route.destinations.join(" -> ")
        );

        Ok(Self {
            dispatcher,
            event_bus,
            running,
            join_timeout: scanner.shutdown_join_timeout(),
            tasks: Mutex::new(Some(EngineTasks {
                producer,
                decode_worker,
                evaluator,
                trigger,
            })),
        })
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Start a new session
    pub fn reset(&self) -> Result<SessionSnapshot> {
        if !self.is_running() {
            return Err(Error::InvalidState("scan engine is stopped".to_string()));
        }
        self.dispatcher.reset();
        Ok(self.snapshot())
    }

    /// Read-only copy of the session and route
    pub fn snapshot(&self) -> SessionSnapshot {
        self.dispatcher.store().snapshot()
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ScanEvent> {
        self.event_bus.subscribe()
    }

    /// Stop every activity
    ///
    /// Loops observe the cleared running flag within one tick; each is given
    /// the configured join timeout before being detached. Detached ledger
    /// tasks are not cancelled, but results arriving after this point are
    /// not applied.
    pub async fn shutdown(&self) {
        if !self.running.swap(false, Ordering::AcqRel) {
            debug!("Scan engine already stopped");
            return;
        }
        info!("Stopping scan engine");

        let tasks = self.tasks.lock().unwrap_or_else(|e| e.into_inner()).take();
        if let Some(tasks) = tasks {
            tasks.join(self.join_timeout).await;
        }

        for handle in self.dispatcher.presenter().shutdown() {
            join_task("presenter", handle, self.join_timeout).await;
        }

        info!("Scan engine stopped");
    }
}
