//! Trigger monitor
//!
//! Polls the trigger input and turns each press into exactly one reset:
//! fire on the high level, wait for release, then settle before re-arming.

use crate::bridges::TriggerInput;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Debounce timing
#[derive(Debug, Clone)]
pub struct TriggerSettings {
    pub poll_interval: Duration,
    pub release_poll: Duration,
    pub settle: Duration,
}

/// Spawn the trigger monitor task
pub fn spawn_trigger_monitor<F>(
    input: Arc<dyn TriggerInput>,
    settings: TriggerSettings,
    running: Arc<AtomicBool>,
    on_press: F,
) -> JoinHandle<()>
where
    F: Fn() + Send + 'static,
{
    tokio::spawn(async move {
        debug!("Trigger monitor started");
        let mut read_error_logged = false;

        while running.load(Ordering::Acquire) {
            match input.is_high() {
                Ok(true) => {
                    read_error_logged = false;
                    info!("Button pressed, starting new scan");
                    on_press();
                    wait_for_release(input.as_ref(), &settings, &running).await;
                    tokio::time::sleep(settings.settle).await;
                }
                Ok(false) => {
                    read_error_logged = false;
                    tokio::time::sleep(settings.poll_interval).await;
                }
                Err(e) => {
                    if !read_error_logged {
                        warn!("Trigger input unavailable: {}", e);
                        read_error_logged = true;
                    }
                    tokio::time::sleep(settings.poll_interval).await;
                }
            }
        }

        debug!("Trigger monitor stopped");
    })
}

async fn wait_for_release(input: &dyn TriggerInput, settings: &TriggerSettings, running: &AtomicBool) {
    while running.load(Ordering::Acquire) {
        match input.is_high() {
            Ok(true) => tokio::time::sleep(settings.release_poll).await,
            // Read errors count as released
            Ok(false) | Err(_) => break,
        }
    }
}
