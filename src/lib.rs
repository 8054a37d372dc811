pub mod auth;
pub mod config;
pub mod daemon;
pub mod digest;
pub mod domain;
pub mod error;
pub mod ipc;
pub mod mail;
