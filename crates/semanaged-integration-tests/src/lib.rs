//! Test support for semanaged end-to-end tests
//!
//! Provides a stand-in runtime home whose `bin/java` records its arguments
//! and then idles, plus helpers to observe process liveness from outside.

pub mod fake_jvm;
pub mod process_probe;
