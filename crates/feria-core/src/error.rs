//! # Error Types
//!
//! Domain error taxonomy for feria-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  feria-core errors (this file)                                         │
//! │  ├── CoreError        - Rule violations (one variant per failure kind) │
//! │  └── ValidationError  - Field-level input failures                     │
//! │                                                                         │
//! │  feria-db errors (separate crate)                                      │
//! │  ├── DbError          - Database operation failures                    │
//! │  └── ServiceError     - Rule(CoreError) | PersistenceFailure(DbError)  │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → ServiceError → caller             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every rule failure is raised before a workflow writes anything, so a
//! `CoreError` never leaves partial state behind.

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Business rule violations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// A referenced record does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// A record is not in the state the operation requires.
    ///
    /// ## When This Occurs
    /// - Registering a sale while the event is still SCHEDULED
    /// - Cancelling a sale that is already CANCELLED or CHANGED
    /// - Stocking a product after its fair has opened
    #[error("{entity} {id} is {actual}, expected {expected}")]
    InvalidState {
        entity: String,
        id: String,
        expected: String,
        actual: String,
    },

    /// Not enough units in the ledger to cover an OUT movement.
    ///
    /// ## User Workflow
    /// ```text
    /// Register sale (qty: 5)
    ///      │
    ///      ▼
    /// stock(product) = Σ IN − Σ OUT = 3
    ///      │
    ///      ▼
    /// InsufficientStock { available: 3, requested: 5 }
    /// ```
    #[error("Insufficient stock for product {product_id}: available {available}, requested {requested}")]
    InsufficientStock {
        product_id: String,
        available: i64,
        requested: i64,
    },

    /// The operation was already performed (second exchange for a sale,
    /// second OUT movement for the same product and sale).
    #[error("Duplicate operation: {kind}")]
    DuplicateOperation { kind: String },

    /// An exchange would deliver a cheaper product than the one returned.
    #[error("Exchange to a lower-value product is not allowed (value difference {value_difference})")]
    DowngradeNotAllowed { value_difference: i64 },

    /// Payment method and fee do not agree (card without fee, cash with fee).
    #[error("Payment coherence violation: {reason}")]
    PaymentCoherenceViolation { reason: String },

    /// Records that must share an event or artisan do not.
    #[error("Cross-entity mismatch: {reason}")]
    CrossEntityMismatch { reason: String },

    /// A record cannot be removed while others still reference it.
    #[error("{entity} {id} still has {dependents}")]
    DependentsExist {
        entity: String,
        id: String,
        dependents: String,
    },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        CoreError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Creates an InvalidState error.
    pub fn invalid_state(
        entity: impl Into<String>,
        id: impl Into<String>,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        CoreError::InvalidState {
            entity: entity.into(),
            id: id.into(),
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Creates a DuplicateOperation error.
    pub fn duplicate(kind: impl Into<String>) -> Self {
        CoreError::DuplicateOperation { kind: kind.into() }
    }

    /// Creates a PaymentCoherenceViolation error.
    pub fn payment(reason: impl Into<String>) -> Self {
        CoreError::PaymentCoherenceViolation {
            reason: reason.into(),
        }
    }

    /// Creates a CrossEntityMismatch error.
    pub fn mismatch(reason: impl Into<String>) -> Self {
        CoreError::CrossEntityMismatch {
            reason: reason.into(),
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when caller input doesn't meet field requirements.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Two fields are in the wrong order (e.g. start after end).
    #[error("{field} must be before {other}")]
    MustPrecede { field: String, other: String },

    /// Two fields were supplied that cannot be used together.
    #[error("{field} and {other} are mutually exclusive")]
    MutuallyExclusive { field: String, other: String },

    /// Duplicate value (e.g. artisan identification).
    #[error("{field} '{value}' already exists")]
    Duplicate { field: String, value: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;
