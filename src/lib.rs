//! ubridge — Umbrella bridge
//!
//! Polls Cisco Umbrella's reporting API on a fixed interval, reshapes DNS,
//! proxy, and firewall activity into a flat schema, and forwards it to a
//! Splunk-compatible HTTP event collector.
//!
//! # Architecture
//!
//! ```text
//! UmbrellaClient ──► transform_batch ──► HecSender
//!   │   token            ▲
//!   │   activity pages   │
//!   └── identities ──► IdentityCache
//! ```
//!
//! [`Connector`] owns one of each and drives the fetch → enrich → transform
//! → send cycle. Shaping lives in `ubridge-core`; network I/O in
//! `ubridge-feeds`.

pub mod connector;

pub use connector::{Connector, CycleReport};
