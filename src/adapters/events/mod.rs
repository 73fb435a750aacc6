//! Event bus adapters.

mod in_memory;

pub use in_memory::{EventListener, InMemoryEventBus};
