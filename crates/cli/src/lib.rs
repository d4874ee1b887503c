//! soltap CLI
//!
//! Command-line harness for test binaries built on `soltap-core`: suite
//! registration, argument parsing, logging setup and exit codes.

pub mod args;
pub mod harness;
pub mod output;

pub use args::{ColorChoice, HarnessArgs};
pub use harness::{Harness, USAGE_ERROR};
pub use output::{OutputFormat, SuiteEntry};
