//! Command handlers. Each one loads its inputs, drives the core crate
//! and renders through `crate::output`.

pub mod config_cmd;
pub mod next_channel;
pub mod reconcile;
pub mod util;
