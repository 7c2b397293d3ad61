//! CHB Common Library
//!
//! Shared infrastructure for the CHB workspace. Currently this is the
//! logging subsystem; anything needed by more than one workspace member
//! belongs here.

pub mod logging;

pub use logging::{init_logging, LogConfig};
