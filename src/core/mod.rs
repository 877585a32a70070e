pub mod config;
pub mod constants;
pub mod context;
pub mod debug_log;
pub mod delay_buffer;
pub mod message;
pub mod splitter;
pub mod store;
pub mod transport;
pub mod turn;
