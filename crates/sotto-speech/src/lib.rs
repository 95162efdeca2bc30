pub mod backend;
pub mod manager;
pub mod null_backend;

pub use backend::{backend_from_config, SessionEvent, SpeechBackend, SpeechSession};
pub use manager::{PushHandle, SessionManager, SessionTiming};
pub use null_backend::NullBackend;

use ringbuf::traits::Split;
use ringbuf::{HeapCons, HeapProd, HeapRb};

/// Create a PCM byte ring split into producer and consumer halves.
pub fn create_pcm_ring(capacity: usize) -> (HeapProd<u8>, HeapCons<u8>) {
    HeapRb::<u8>::new(capacity).split()
}
