pub mod data;
pub mod io;

pub use data::Settings;
pub use io::ConfigError;
