//! Decode worker
//!
//! Consumes queued frames one at a time, runs the decoder on the blocking
//! pool and reports confident reads to the session store. Waits on the queue
//! only while the session is scanning; otherwise polls the phase.

use super::frame_queue::FrameConsumer;
use crate::bridges::{BridgeError, Decoder};
use crate::session::{DecodeVerdict, SessionStore};
use sctrk_common::events::{EventBus, ScanEvent};
use sctrk_common::time;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

/// Decode worker timing
#[derive(Debug, Clone)]
pub struct DecodeWorkerSettings {
    /// Poll interval while the session is not scanning
    pub idle_poll: Duration,
    /// Longest single wait on an empty queue (bounds shutdown latency)
    pub max_wait: Duration,
}

/// Spawn the decode worker task
pub fn spawn_decode_worker(
    decoder: Arc<dyn Decoder>,
    store: Arc<SessionStore>,
    consumer: FrameConsumer,
    event_bus: EventBus,
    settings: DecodeWorkerSettings,
    running: Arc<AtomicBool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        decode_loop(decoder, store, consumer, event_bus, settings, running).await;
    })
}

async fn decode_loop(
    decoder: Arc<dyn Decoder>,
    store: Arc<SessionStore>,
    mut consumer: FrameConsumer,
    event_bus: EventBus,
    settings: DecodeWorkerSettings,
    running: Arc<AtomicBool>,
) {
    info!("Decode worker started");
    let notify = consumer.notified();
    let mut decoded_frames: u64 = 0;

    while running.load(Ordering::Acquire) {
        let Some(epoch) = store.scanning_epoch() else {
            tokio::time::sleep(settings.idle_poll).await;
            continue;
        };

        let Some(queued) = consumer.pop() else {
            // Woken by the next push, or re-check phase after max_wait
            let _ = tokio::time::timeout(settings.max_wait, notify.notified()).await;
            continue;
        };

        if queued.epoch != epoch {
            trace!(
                "Discarding frame {} from scan epoch {} (current {})",
                queued.frame.sequence,
                queued.epoch,
                epoch
            );
            continue;
        }

        let decoder = Arc::clone(&decoder);
        let frame_epoch = queued.epoch;
        let result = tokio::task::spawn_blocking(move || decoder.decode(&queued.frame)).await;
        decoded_frames += 1;

        let detection = match result {
            Ok(Ok(Some(detection))) => detection,
            Ok(Ok(None)) => continue,
            Ok(Err(BridgeError::DecodeTransient(reason))) => {
                trace!("Skipping frame: {}", reason);
                continue;
            }
            Ok(Err(e)) => {
                warn!("Decoder error: {}", e);
                continue;
            }
            Err(e) => {
                warn!("Decode task failed: {}", e);
                continue;
            }
        };

        let confidence = detection.confidence_percent();
        let (verdict, session_id) = store.record_decode(frame_epoch, &detection.value, confidence);

        match verdict {
            DecodeVerdict::Accepted => {
                debug!("Decoded {} (confidence {:.2}%)", detection.value, confidence);
                event_bus.emit_lossy(ScanEvent::ItemDetected {
                    session_id,
                    value: detection.value,
                    confidence,
                    timestamp: time::now(),
                });
            }
            DecodeVerdict::BelowThreshold => {
                trace!(
                    "Ignoring {} below confidence threshold ({:.2}%)",
                    detection.value,
                    confidence
                );
            }
            other => trace!("Decode not recorded: {:?}", other),
        }
    }

    debug!("Decode worker stopped after {} decodes", decoded_frames);
}
