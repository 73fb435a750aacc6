//! Language model adapters.
//!
//! Real inference runtimes live in host applications; the engine ships the
//! mock used by tests and demos.

mod mock;

pub use mock::{MockLanguageModel, MockResponse};
