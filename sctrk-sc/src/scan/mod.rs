//! Scan orchestration
//!
//! Concurrent activities sharing one `SessionStore`:
//! - `producer`: capture thread feeding the bounded `frame_queue`
//! - `decode_worker`: turns queued frames into decode records
//! - `evaluator`: fixed-tick state machine driver and effect dispatch
//! - `trigger`: debounced button to reset
//! - `ledger`: detached lookup/commit tasks posting results back
//! - `presenter`: tone queue and indicator

pub mod decode_worker;
pub mod engine;
pub mod evaluator;
pub mod frame_queue;
pub mod ledger;
pub mod presenter;
pub mod producer;
pub mod trigger;

pub use engine::{EngineBridges, ScanEngine};
