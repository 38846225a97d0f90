#![forbid(unsafe_code)]

pub mod aof;
mod config;
mod db;
mod entry;
mod value;

pub use aof::{AofWriter, Command, Operation, log_path, replay_aof};
pub use config::StoreConfig;
pub use db::Db;
pub use entry::Entry;
pub use value::{Kind, Value};
