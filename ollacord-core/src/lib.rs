//! Core types and traits for ollacord
//!
//! This crate provides the configuration layer, logging setup, message
//! events and the per-channel conversation history shared by the other
//! ollacord crates.

pub mod bus;
pub mod config;
pub mod error;
pub mod history;
pub mod logging;

pub use error::{Error, Result};
