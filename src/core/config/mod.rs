pub mod data;
pub mod io;
pub mod printing;


pub use data::{BackendKind, Config};
pub use io::ConfigError;
