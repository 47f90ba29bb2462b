use crate::StepId;
use std::{any, error::Error as StdError};
use thiserror::Error as ThisError;

pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// Stable classification of every failure the core can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    PgTypeNotFound,
    HostTypeNotMapped,
    PgTypeNotMapped,
    DynamicTypeNotFound,
    WrongFieldNumberInComposite,
    AttributeNotFound,
    WrongAttributeType,
    EnumConversionFailed,
    ObjectMappingFailed,
    MissingRequiredProperty,
    ValueConversionFailed,
    MissingParameter,
    QueryFailed,
    UnknownHandle,
    DependencyOnFutureStep,
    NullSourceResult,
    ResultNotList,
    ResultNotMapList,
    RowIndexOutOfBounds,
    ColumnNotFound,
    StepFailed,
    UnexpectedRollback,
    Serialization,
    Other,
}

impl ErrorKind {
    pub fn code(&self) -> &'static str {
        match self {
            ErrorKind::PgTypeNotFound => "PG_TYPE_NOT_FOUND",
            ErrorKind::HostTypeNotMapped => "HOST_TYPE_NOT_MAPPED",
            ErrorKind::PgTypeNotMapped => "PG_TYPE_NOT_MAPPED",
            ErrorKind::DynamicTypeNotFound => "DYNAMIC_TYPE_NOT_FOUND",
            ErrorKind::WrongFieldNumberInComposite => "WRONG_FIELD_NUMBER_IN_COMPOSITE",
            ErrorKind::AttributeNotFound => "ATTRIBUTE_NOT_FOUND",
            ErrorKind::WrongAttributeType => "WRONG_ATTRIBUTE_TYPE",
            ErrorKind::EnumConversionFailed => "ENUM_CONVERSION_FAILED",
            ErrorKind::ObjectMappingFailed => "OBJECT_MAPPING_FAILED",
            ErrorKind::MissingRequiredProperty => "MISSING_REQUIRED_PROPERTY",
            ErrorKind::ValueConversionFailed => "VALUE_CONVERSION_FAILED",
            ErrorKind::MissingParameter => "MISSING_PARAMETER",
            ErrorKind::QueryFailed => "QUERY_FAILED",
            ErrorKind::UnknownHandle => "UNKNOWN_HANDLE",
            ErrorKind::DependencyOnFutureStep => "DEPENDENCY_ON_FUTURE_STEP",
            ErrorKind::NullSourceResult => "NULL_SOURCE_RESULT",
            ErrorKind::ResultNotList => "RESULT_NOT_LIST",
            ErrorKind::ResultNotMapList => "RESULT_NOT_MAP_LIST",
            ErrorKind::RowIndexOutOfBounds => "ROW_INDEX_OUT_OF_BOUNDS",
            ErrorKind::ColumnNotFound => "COLUMN_NOT_FOUND",
            ErrorKind::StepFailed => "STEP_FAILED",
            ErrorKind::UnexpectedRollback => "UNEXPECTED_ROLLBACK",
            ErrorKind::Serialization => "SERIALIZATION",
            ErrorKind::Other => "OTHER",
        }
    }
}

/// Unregistered or inconsistently registered types.
#[derive(Debug, Clone, PartialEq, Eq, ThisError)]
pub enum RegistryError {
    #[error("Postgres type `{0}` is not present in the type registry")]
    PgTypeNotFound(String),
    #[error("Rust type `{0}` is not mapped to any Postgres type")]
    HostTypeNotMapped(&'static str),
    #[error("Postgres type `{0}` is not mapped to any Rust type")]
    PgTypeNotMapped(String),
    #[error("Dynamic type tag `{0}` is not registered")]
    DynamicTypeNotFound(String),
    #[error("Composite type `{type_name}` has {expected} attributes but {found} fields were provided")]
    WrongFieldNumberInComposite {
        type_name: String,
        expected: usize,
        found: usize,
    },
    #[error("Composite type `{type_name}` has no attribute `{attribute}`")]
    AttributeNotFound { type_name: String, attribute: String },
    #[error("Attribute `{attribute}` of `{type_name}` is `{expected}` in the store but `{found}` in Rust")]
    WrongAttributeType {
        type_name: String,
        attribute: String,
        expected: String,
        found: String,
    },
}

impl RegistryError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RegistryError::PgTypeNotFound(..) => ErrorKind::PgTypeNotFound,
            RegistryError::HostTypeNotMapped(..) => ErrorKind::HostTypeNotMapped,
            RegistryError::PgTypeNotMapped(..) => ErrorKind::PgTypeNotMapped,
            RegistryError::DynamicTypeNotFound(..) => ErrorKind::DynamicTypeNotFound,
            RegistryError::WrongFieldNumberInComposite { .. } => {
                ErrorKind::WrongFieldNumberInComposite
            }
            RegistryError::AttributeNotFound { .. } => ErrorKind::AttributeNotFound,
            RegistryError::WrongAttributeType { .. } => ErrorKind::WrongAttributeType,
        }
    }
}

/// Value, enum or composite shape mismatches while expanding or extracting.
#[derive(Debug, ThisError)]
pub enum ConversionError {
    #[error("`{label}` is not a label of the enum `{type_name}`")]
    EnumConversionFailed { type_name: String, label: String },
    #[error("Could not build `{target}` from the composite `{type_name}`")]
    ObjectMappingFailed {
        target: &'static str,
        type_name: String,
        #[source]
        source: BoxError,
    },
    #[error("Column `{column}` required by `{target}` is missing from the row")]
    MissingRequiredProperty { target: &'static str, column: String },
    #[error("Cannot convert `{value}` into {target}")]
    ValueConversionFailed { target: &'static str, value: String },
    #[error("Parameter `:{0}` is referenced by the query but has no value")]
    MissingParameter(String),
}

impl ConversionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ConversionError::EnumConversionFailed { .. } => ErrorKind::EnumConversionFailed,
            ConversionError::ObjectMappingFailed { .. } => ErrorKind::ObjectMappingFailed,
            ConversionError::MissingRequiredProperty { .. } => ErrorKind::MissingRequiredProperty,
            ConversionError::ValueConversionFailed { .. } => ErrorKind::ValueConversionFailed,
            ConversionError::MissingParameter(..) => ErrorKind::MissingParameter,
        }
    }
    pub fn value_conversion<T: ?Sized>(value: impl std::fmt::Debug) -> Self {
        ConversionError::ValueConversionFailed {
            target: any::type_name::<T>(),
            value: format!("{:?}", value),
        }
    }
    pub fn object_mapping<T: ?Sized>(type_name: impl Into<String>, source: impl Into<BoxError>) -> Self {
        ConversionError::ObjectMappingFailed {
            target: any::type_name::<T>(),
            type_name: type_name.into(),
            source: source.into(),
        }
    }
    pub fn missing_property<T: ?Sized>(column: impl Into<String>) -> Self {
        ConversionError::MissingRequiredProperty {
            target: any::type_name::<T>(),
            column: column.into(),
        }
    }
}

/// Invalid cross references between the steps of a transaction plan.
#[derive(Debug, Clone, PartialEq, Eq, ThisError)]
pub enum DependencyError {
    #[error("Step {0} is not part of the plan being executed")]
    UnknownHandle(StepId),
    #[error("Step {0} did not produce a result yet")]
    DependencyOnFutureStep(StepId),
    #[error("Step {0} produced no result to read from")]
    NullSourceResult(StepId),
    #[error("Step {0} did not produce a list of values")]
    ResultNotList(StepId),
    #[error("Step {0} did not produce a list of rows")]
    ResultNotMapList(StepId),
    #[error("Row {index} requested from step {step} which produced {len} rows")]
    RowIndexOutOfBounds {
        step: StepId,
        index: usize,
        len: usize,
    },
    #[error("Column `{column}` does not exist in the result of step {step}")]
    ColumnNotFound { step: StepId, column: String },
}

impl DependencyError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DependencyError::UnknownHandle(..) => ErrorKind::UnknownHandle,
            DependencyError::DependencyOnFutureStep(..) => ErrorKind::DependencyOnFutureStep,
            DependencyError::NullSourceResult(..) => ErrorKind::NullSourceResult,
            DependencyError::ResultNotList(..) => ErrorKind::ResultNotList,
            DependencyError::ResultNotMapList(..) => ErrorKind::ResultNotMapList,
            DependencyError::RowIndexOutOfBounds { .. } => ErrorKind::RowIndexOutOfBounds,
            DependencyError::ColumnNotFound { .. } => ErrorKind::ColumnNotFound,
        }
    }
}

#[derive(Debug, ThisError)]
pub enum Error {
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error(transparent)]
    Conversion(#[from] ConversionError),
    #[error(transparent)]
    Dependency(#[from] DependencyError),
    #[error("Query failed:\n{sql}\nParameters: {params}")]
    Query {
        sql: String,
        params: String,
        #[source]
        source: BoxError,
    },
    #[error("Transaction step {index} failed")]
    Step {
        index: usize,
        #[source]
        source: Box<Error>,
    },
    #[error("The transaction was marked rollback-only and has been rolled back")]
    UnexpectedRollback,
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    pub fn msg(message: impl std::fmt::Display + std::fmt::Debug + Send + Sync + 'static) -> Self {
        Error::Other(anyhow::Error::msg(message))
    }
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Registry(e) => e.kind(),
            Error::Conversion(e) => e.kind(),
            Error::Dependency(e) => e.kind(),
            Error::Query { .. } => ErrorKind::QueryFailed,
            Error::Step { .. } => ErrorKind::StepFailed,
            Error::UnexpectedRollback => ErrorKind::UnexpectedRollback,
            Error::Serialization(..) => ErrorKind::Serialization,
            Error::Other(..) => ErrorKind::Other,
        }
    }
    /// Kind of the innermost error, looking through step failures.
    pub fn root_kind(&self) -> ErrorKind {
        match self {
            Error::Step { source, .. } => source.root_kind(),
            _ => self.kind(),
        }
    }
    /// Index of the failed step, when the error comes from a transaction plan.
    pub fn step_index(&self) -> Option<usize> {
        match self {
            Error::Step { index, .. } => Some(*index),
            _ => None,
        }
    }
}
