#![forbid(unsafe_code)]

mod error;

pub use error::*;

pub const DEFAULT_PORT: u16 = 6379;
pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_AOF_PATH: &str = "redstore.aof";
pub const MAX_CONNECTIONS: usize = 1024;
pub const INITIAL_BUFFER_CAPACITY: usize = 4 * 1024; // 4 KB
pub const MAX_LINE_SIZE: usize = 1024 * 1024; // 1 MB
/// Resposta para chave ausente ou expirada.
pub const NIL_REPLY: &str = "nil";
