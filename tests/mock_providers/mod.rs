//! Mock provider servers
//!
//! - Gemini Live websocket sessions (`accept_async`)
//! - REST backends are mocked per test with wiremock

// Not every test binary uses every helper
#![allow(dead_code)]

pub mod live_mock;

pub use live_mock::{LiveMock, LiveScript};
