pub mod config;
pub mod error;
pub mod graph;
pub mod loader;
pub mod remote;
pub mod runtime;
pub mod storage;
pub mod template;
