pub mod clock;
pub mod error;
pub mod habit;
pub mod notifications;
pub mod progress;
pub mod repository;
pub mod schedule;
pub mod service;
pub mod session;
pub mod snapshot;
pub mod stats;
pub mod store;
pub mod todo;

pub use crate::error::{DashboardError, DashboardResult, MutationAction, MutationState, RepositoryError};
pub use crate::service::{DashboardConfig, DashboardService, DashboardServiceBuilder, RefreshOutcome};
