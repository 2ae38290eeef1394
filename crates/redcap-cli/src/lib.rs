//! Library side of the `redcap-etl` binary.

pub mod artifacts;
pub mod config;
pub mod logging;
pub mod pipeline;
pub mod scaffold;
