pub mod annotator;
pub mod client;
pub mod config;
pub mod contact;
pub mod error;
pub mod models;
pub mod parser;
pub mod projector;
pub mod session;
