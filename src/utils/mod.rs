//! Utility modules

pub mod logging;

pub use logging::{init_logger, level_for_verbosity};
