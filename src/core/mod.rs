//! Core types shared across runx

pub mod error;

pub use error::{Result, RunxError};
