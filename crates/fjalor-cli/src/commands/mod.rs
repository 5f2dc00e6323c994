//! Command handlers

pub mod config;
pub mod entry;
pub mod speech;
pub mod status;
pub mod sync;
pub mod transfer;
