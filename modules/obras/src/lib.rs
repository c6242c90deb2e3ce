//! # obras - screens of the construction-project backoffice
//!
//! - [`contract`]: the model the screens work with and the [`ObrasApi`] seam
//! - `domain`: screen logic ([`Service`]), budget aggregation, receipt rules
//!   and the localized error messages
//! - `infra::http`: the REST implementation of [`ObrasApi`]

// === PUBLIC CONTRACT ===
pub mod contract;
pub use contract::{client::ObrasApi, model};

// === INTERNAL MODULES ===
#[doc(hidden)]
pub mod config;
#[doc(hidden)]
pub mod domain;
#[doc(hidden)]
pub mod infra;

pub use config::ObrasConfig;
pub use domain::error::{Action, DomainError};
pub use domain::service::{Service, WorkForm};
pub use domain::views::{
    DashboardView, ExpenseRow, PartDetailView, ReceiptView, UserDetailView, UserListView,
    WorkCard, WorkDetailView, WorkFormView,
};
pub use infra::http::client::HttpObrasClient;
