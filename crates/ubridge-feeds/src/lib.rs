//! ubridge-feeds — network adapters for ubridge.
//!
//! [`UmbrellaClient`] pulls OAuth tokens, identity listings, and paginated
//! activity windows from Cisco Umbrella; [`HecSender`] delivers transformed
//! events to an HTTP event collector. Neither retries: a failed request is
//! logged or returned and the next cycle starts fresh.

pub mod error;
pub mod hec;
pub mod umbrella;

pub use error::FeedError;
pub use hec::HecSender;
pub use umbrella::{ActivityEndpoint, ActivityWindow, UmbrellaClient};
