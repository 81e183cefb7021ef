//! Frame producer
//!
//! Dedicated capture thread. Frames are captured continuously; every Kth
//! frame is pushed into the frame queue while the session is scanning,
//! stamped with the current scan epoch. A full queue drops the frame.

use super::frame_queue::{FrameProducer, QueuedFrame};
use crate::bridges::{BridgeError, Camera};
use crate::session::SessionStore;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Producer timing
#[derive(Debug, Clone)]
pub struct ProducerSettings {
    /// Enqueue every Nth captured frame
    pub skip_frames: u32,
    /// Delay after an empty frame or camera error
    pub empty_frame_retry: Duration,
}

/// Spawn the capture thread
pub fn spawn_producer(
    camera: Arc<dyn Camera>,
    store: Arc<SessionStore>,
    queue: FrameProducer,
    settings: ProducerSettings,
    running: Arc<AtomicBool>,
) -> std::io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("sctrk-producer".to_string())
        .spawn(move || producer_loop(camera, store, queue, settings, running))
}

fn producer_loop(
    camera: Arc<dyn Camera>,
    store: Arc<SessionStore>,
    mut queue: FrameProducer,
    settings: ProducerSettings,
    running: Arc<AtomicBool>,
) {
    info!("Frame producer started (enqueue every {} frames)", settings.skip_frames);

    let skip = settings.skip_frames.max(1) as u64;
    let mut captured: u64 = 0;
    let mut camera_down = false;

    while running.load(Ordering::Acquire) {
        let frame = match camera.capture_frame() {
            Ok(Some(frame)) => {
                if camera_down {
                    info!("Camera delivering frames again");
                    camera_down = false;
                }
                frame
            }
            Ok(None) => {
                thread::sleep(settings.empty_frame_retry);
                continue;
            }
            Err(e) => {
                // Log once per outage
                if !camera_down {
                    match e {
                        BridgeError::Unavailable(_) => warn!("Camera unavailable: {}", e),
                        _ => warn!("Camera capture failed: {}", e),
                    }
                    camera_down = true;
                }
                thread::sleep(settings.empty_frame_retry);
                continue;
            }
        };

        captured += 1;
        if captured % skip != 0 {
            continue;
        }

        if let Some(epoch) = store.scanning_epoch() {
            queue.push(QueuedFrame { frame, epoch });
        }
    }

    let stats = queue.stats();
    debug!(
        "Frame producer stopped ({} frames captured, {} queued, {} dropped)",
        captured, stats.pushed, stats.dropped
    );
}
