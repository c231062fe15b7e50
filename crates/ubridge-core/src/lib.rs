//! ubridge-core — Umbrella bridge core library.
//!
//! This crate holds everything between "a page of activity records arrived"
//! and "a payload is ready for the event collector". It performs no network
//! I/O; the feeds crate fetches and delivers, this crate shapes.
//!
//! # Pipeline
//!
//! ```text
//! RawRecord ──► classify ──► shape (dns | proxy) ──► NormalizedEvent ──► HEC payload
//!                  │                  ▲
//!                  │                  └── labels / categories / identity resolver
//!                  └──► passthrough (firewall | unknown)
//! ```
//!
//! Every stage is a pure function of its inputs, so a batch can be shaped on
//! any thread. The reference path is sequential and order-preserving.

pub mod categories;
pub mod config;
pub mod hec;
pub mod identity;
pub mod labels;
pub mod normalizer;
pub mod types;

pub use identity::{IdentityCache, IdentityResolver};
pub use normalizer::{transform, transform_batch};
pub use types::{LogType, NormalizedEvent, RawRecord, ShapeFields, Transformed};
