//! Shared test utilities for ubridge integration harnesses.
//!
//! Import everything you need via `mod common; use common::*;` at the top of
//! each harness file. Network harnesses also pull in
//! [`fake_umbrella_api::FakeUmbrellaApi`].

#![allow(dead_code)]

pub mod assertions;
pub mod fake_umbrella_api;

pub use assertions::*;
pub use builders::*;
pub use fixtures::*;
