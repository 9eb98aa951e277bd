#![forbid(unsafe_code)]

pub mod aof;
mod entry;
mod store;

pub use aof::{AofLog, FsyncPolicy, ReplayStats, is_write_command, replay_aof};
pub use store::{FIELD_SEPARATOR, Store};
