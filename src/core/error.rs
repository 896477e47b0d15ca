use thiserror::Error;
use uuid::Uuid;

/// Local, non-retryable failures surfaced to the caller as-is.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Invalid identifier '{0}'")]
    InvalidIdentifier(String),

    #[error("Invalid coordinate {0}")]
    InvalidCoordinate(String),

    #[error("Duplicated {kind} '{id}' where a single row was expected")]
    Duplicated { kind: &'static str, id: String },

    #[error("Not enough resource '{resource}' to perform the action")]
    NotEnoughResources { resource: Uuid },

    #[error("Not enough fuel '{resource}' to launch the component")]
    NotEnoughFuel { resource: Uuid },

    #[error("Not enough ships '{ship}' on the planet")]
    NotEnoughShips { ship: Uuid },

    #[error("Dependencies of '{element}' are not met")]
    DependenciesNotMet { element: Uuid },

    #[error("Insufficient cargo space: {needed} needed, {capacity} available")]
    InsufficientCargo { needed: f64, capacity: f64 },

    #[error("Invalid cargo value for resource '{resource}'")]
    InvalidCargo { resource: Uuid },

    #[error("Arrival time mismatch: fleet expects {expected}, component arrives at {computed}")]
    ArrivalTimeMismatch { expected: String, computed: String },

    #[error("Unknown objective '{0}'")]
    UnknownObjective(String),

    #[error("Invalid objective: {0}")]
    InvalidObjective(String),

    #[error("Invalid action: {0}")]
    InvalidAction(String),

    #[error("Invalid component: {0}")]
    InvalidComponent(String),

    #[error("Unknown {kind} '{id}'")]
    UnknownElement { kind: &'static str, id: String },

    #[error("Unknown propulsion system for ship '{ship}'")]
    InvalidPropulsion { ship: Uuid },

    #[error("Invalid universe: {0}")]
    InvalidUniverse(String),

    #[error("Objective '{0}' cannot be simulated")]
    UnsupportedObjective(String),
}

/// Failures reported by the relational store, classified from native text.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Query error: {0}")]
    Query(String),

    #[error("Null value in column '{column}' violates not-null constraint")]
    NonNullViolation { column: String },

    #[error("Foreign key constraint '{constraint}' violated")]
    ForeignKeyViolation { constraint: String },

    #[error("Duplicate key violates unique constraint '{constraint}'")]
    DuplicateKey { constraint: String },

    #[error("Unsupported query: {0}")]
    Unsupported(String),

    #[error("Cannot scan column {index} as {expected}")]
    Scan { index: usize, expected: &'static str },
}

/// Catalog load problems: the module is rejected as a whole.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConsistencyError {
    #[error("Override of existing {module} '{id}'")]
    Override { module: &'static str, id: String },

    #[error("Dangling dependency of '{element}' on '{requirement}'")]
    DanglingDependency { element: String, requirement: String },

    #[error("Duplicated name '{0}'")]
    DuplicatedName(String),

    #[error("Inconsistent data: {0}")]
    Inconsistent(String),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LockError {
    #[error("Lock on '{0}' is not held")]
    NotHeld(String),

    #[error("Guard for '{guard}' cannot release lock on '{lock}'")]
    NotOwner { lock: Uuid, guard: Uuid },

    #[error("Poisoned lock: {0}")]
    Poisoned(String),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum GameError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Consistency(#[from] ConsistencyError),

    #[error(transparent)]
    Lock(#[from] LockError),

    #[error("{kind} '{id}' not found")]
    NotFound { kind: &'static str, id: String },
}

impl GameError {
    pub fn not_found(kind: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            kind,
            id: id.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

pub type Result<T> = std::result::Result<T, GameError>;

impl<T> From<std::sync::PoisonError<T>> for GameError {
    fn from(err: std::sync::PoisonError<T>) -> Self {
        Self::Lock(LockError::Poisoned(err.to_string()))
    }
}
