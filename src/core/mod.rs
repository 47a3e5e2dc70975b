pub mod backend;
pub mod chat_stream;
pub mod config;
pub mod conversation;
pub mod decoder;
pub mod error;
pub mod locale;
pub mod message;
pub mod session;
