//! Error types surfaced by the engine.

use crate::core::currency::FxError;
use crate::core::member::MemberId;
use crate::core::validation::ValidationError;
use crate::ledger::repository::RepositoryError;
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;

/// The kind of entity a dangling reference points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    Member,
    Expense,
    Settlement,
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Entity::Member => write!(f, "member"),
            Entity::Expense => write!(f, "expense"),
            Entity::Settlement => write!(f, "settlement"),
        }
    }
}

/// A reference to an entity that does not exist in the snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {entity} '{id}' referenced by {context}")]
pub struct ReferenceError {
    pub entity: Entity,
    pub id: String,
    pub context: String,
}

impl ReferenceError {
    pub fn member(id: &MemberId, context: impl Into<String>) -> Self {
        Self {
            entity: Entity::Member,
            id: id.to_string(),
            context: context.into(),
        }
    }

    pub fn expense(id: Uuid) -> Self {
        Self {
            entity: Entity::Expense,
            id: id.to_string(),
            context: "pot".to_string(),
        }
    }

    pub fn settlement(id: Uuid) -> Self {
        Self {
            entity: Entity::Settlement,
            id: id.to_string(),
            context: "pot".to_string(),
        }
    }
}

/// Engine errors.
///
/// `Reference` and `Validation` are caused by bad input and should block
/// the mutation that introduced them. `InvariantViolation` means the data
/// handed to the engine is internally inconsistent; it is always fatal to
/// the current computation.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("reference error: {0}")]
    Reference(#[from] ReferenceError),

    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    #[error("fx error: {0}")]
    Fx(#[from] FxError),

    #[error("repository error: {0}")]
    Repository(#[from] RepositoryError),
}

impl EngineError {
    /// Build an invariant violation and log it; these indicate upstream
    /// corruption and must not pass silently.
    pub(crate) fn invariant(message: impl Into<String>) -> Self {
        let message = message.into();
        log::error!("invariant violation: {}", message);
        EngineError::InvariantViolation(message)
    }

    pub fn is_reference(&self) -> bool {
        matches!(self, EngineError::Reference(_))
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, EngineError::Validation(_))
    }

    pub fn is_invariant_violation(&self) -> bool {
        matches!(self, EngineError::InvariantViolation(_))
    }
}
