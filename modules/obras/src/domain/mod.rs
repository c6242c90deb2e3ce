pub mod budget;
pub mod error;
pub mod messages;
pub mod receipt;
pub mod service;
pub mod views;
