//! Common test infrastructure
//!
//! In-memory collaborators and a pipeline fixture wired to them. Tests should
//! only import from this module, not from internal submodules.
//!
//! # Example
//!
//! ```no_run
//! mod common;
//! use common::{topic_candidate, TestPipeline};
//!
//! #[tokio::test]
//! async fn test_resolve() {
//!     let test = TestPipeline::new();
//!     test.index.add_results("A", "B", vec![topic_candidate("A", "B")]);
//! }
//! ```

mod constants;
mod fakes;
mod fixtures;

pub use constants::*;
#[allow(unused_imports)]
pub use fakes::{
    FakeFetcher, FakeMediaIndex, FakeTagger, PendingAtEmit, RecordingEventSink, ToggleExistence,
};
#[allow(unused_imports)]
pub use fixtures::{live_candidate, topic_candidate, TestPipeline};
