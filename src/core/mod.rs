pub mod app;
pub mod builtin_interfaces;
pub mod chat_stream;
pub mod config;
pub mod export;
pub mod message;
pub mod session;
pub mod storage;
pub mod store;
