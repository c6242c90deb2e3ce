//! HTTP layer: replayable request descriptions and the authenticated client.

pub mod client;
pub mod request;
