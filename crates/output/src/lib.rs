#![deny(unsafe_code)]
//! Output side of backdrop: 8-bit quantization, PNG snapshots and the batch
//! runner that renders and persists many backgrounds.
//!
//! The core crate never touches the filesystem; everything here sits between
//! `backdrop-core` and callers that want files on disk (the CLI, scripts).

pub mod pixel;

#[cfg(feature = "png")]
pub mod snapshot;

#[cfg(feature = "png")]
pub mod batch;
