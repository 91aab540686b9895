use sea_orm::{DbErr, SqlErr};
use thiserror::Error;

pub type HrResult<T> = Result<T, HrError>;

#[derive(Debug, Error)]
pub enum HrError {
    #[error("{field} is required")]
    MissingRequiredField { field: &'static str },
    #[error("{field} `{value}` already exists")]
    DuplicateKey { field: &'static str, value: String },
    /// `detail` is the missing id, or the driver message when the database
    /// rejected the write.
    #[error("{field} references unknown record: {detail}")]
    InvalidReference { field: &'static str, detail: String },
    #[error("{field}: {reason}")]
    TypeMismatch { field: String, reason: String },
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },
    #[error("{entity} {id} would become its own ancestor")]
    HierarchyCycle { entity: &'static str, id: String },
    #[error("database error: {0}")]
    Database(#[source] DbErr),
}

impl HrError {
    pub fn code(&self) -> &'static str {
        match self {
            HrError::MissingRequiredField { .. } => "MISSING_REQUIRED_FIELD",
            HrError::DuplicateKey { .. } => "DUPLICATE_KEY",
            HrError::InvalidReference { .. } => "INVALID_REFERENCE",
            HrError::TypeMismatch { .. } => "TYPE_MISMATCH",
            HrError::NotFound { .. } => "NOT_FOUND",
            HrError::HierarchyCycle { .. } => "HIERARCHY_CYCLE",
            HrError::Database(_) => "INTERNAL",
        }
    }

    pub(crate) fn mismatch(field: impl Into<String>, reason: impl Into<String>) -> Self {
        HrError::TypeMismatch {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

impl From<DbErr> for HrError {
    fn from(err: DbErr) -> Self {
        match err.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(detail)) => HrError::DuplicateKey {
                field: code_field(&detail),
                value: detail,
            },
            Some(SqlErr::ForeignKeyConstraintViolation(detail)) => HrError::InvalidReference {
                field: reference_field(&detail),
                detail,
            },
            _ => HrError::Database(err),
        }
    }
}

// Postgres reports the index name, SQLite the table.column pair.
fn code_field(detail: &str) -> &'static str {
    if detail.contains("position") {
        "positionCode"
    } else {
        "departmentCode"
    }
}

// Postgres names the constraint; SQLite only says a foreign key failed.
fn reference_field(detail: &str) -> &'static str {
    if detail.contains("fk_departments_parent") {
        "parentDepartmentId"
    } else if detail.contains("fk_positions_department") {
        "departmentId"
    } else if detail.contains("fk_positions_reports_to") {
        "reportsToPositionId"
    } else {
        "reference"
    }
}
