use std::fmt;

use thiserror::Error;

/// Failure reported by a [`crate::repository::DashboardRepository`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RepositoryError {
    #[error("{kind} `{id}` not found")]
    NotFound { kind: &'static str, id: String },
    #[error("repository backend failure: {0}")]
    Backend(String),
}

impl RepositoryError {
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend(message.into())
    }
}

/// Which completion action a mutation error belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationAction {
    CompleteHabit,
    CompleteTodo,
}

impl fmt::Display for MutationAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MutationAction::CompleteHabit => f.write_str("complete habit"),
            MutationAction::CompleteTodo => f.write_str("complete todo"),
        }
    }
}

/// How much of a mutation reached the repository before it failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationState {
    /// Nothing was written.
    NotApplied,
    /// An earlier write succeeded and a later one failed. The persisted state
    /// is left as-is.
    Partial,
}

impl fmt::Display for MutationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MutationState::NotApplied => f.write_str("not applied"),
            MutationState::Partial => f.write_str("partially applied"),
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DashboardError {
    #[error("failed to load dashboard data: {0}")]
    Fetch(#[source] RepositoryError),
    #[error("failed to {action} `{target}` ({state}): {source}")]
    Mutation {
        action: MutationAction,
        target: String,
        state: MutationState,
        #[source]
        source: RepositoryError,
    },
    #[error("invalid habit frequency `{0}`")]
    InvalidFrequency(String),
}

impl DashboardError {
    pub fn is_partial_mutation(&self) -> bool {
        matches!(
            self,
            DashboardError::Mutation {
                state: MutationState::Partial,
                ..
            }
        )
    }
}

pub type DashboardResult<T> = Result<T, DashboardError>;
