//! # Pod metadata translation
//!
//! This crate turns the untyped annotations and labels of a Kubernetes
//! pod into a strongly typed [`Config`] for the container runtime.
//! Every recognized key is either parsed into its type or reported as an
//! [`Error`]; all errors from one pass are collected into [`Errors`]
//! rather than stopping at the first.

// See https://doc.rust-lang.org/rustc/lints/listing/allowed-by-default.html
#![deny(missing_docs)]
#![deny(missing_debug_implementations)]
#![forbid(unused_must_use)]
#![deny(unsafe_code)]
#![deny(clippy::dbg_macro)]
#![deny(clippy::todo)]

pub mod cli;
mod config;
pub mod duration;
mod error;
pub mod imgref;
pub mod k8sapitypes;
pub mod keys;
pub mod quantity;
mod sidecar;
mod values;

pub use config::{pod_schema_version, translate, translate_pod, Config, Translation};
pub use error::{Error, Errors, Source};
pub use imgref::ImageReferenceError;
pub use sidecar::Sidecar;
pub use values::Pattern;
