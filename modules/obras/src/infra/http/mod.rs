//! REST gateway: wire DTOs, their mapping to the contract model, and the
//! [`ObrasApi`](crate::contract::client::ObrasApi) implementation.

pub mod client;
pub mod dto;
pub mod mapper;
