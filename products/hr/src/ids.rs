//! Typed identifiers for every record the HR model points at.
//!
//! Departments and positions live in this crate's tables; pay grades, users
//! and employees belong to other services and are only ever carried as opaque
//! ids.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::HrError;

macro_rules! typed_id {
    ($(#[$meta:meta])* $name:ident => $field:literal) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            pub fn generate() -> Self {
                Self(Uuid::new_v4())
            }

            pub const fn from_uuid(id: Uuid) -> Self {
                Self(id)
            }

            pub const fn into_uuid(self) -> Uuid {
                self.0
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl FromStr for $name {
            type Err = HrError;

            fn from_str(raw: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(raw.trim())
                    .map(Self)
                    .map_err(|err| HrError::mismatch($field, err.to_string()))
            }
        }
    };
}

typed_id!(
    /// Primary key of a department row.
    DepartmentId => "departmentId"
);
typed_id!(
    /// Primary key of a position row.
    PositionId => "positionId"
);
typed_id!(
    /// Compensation tier owned by the payroll service.
    PayGradeId => "payGradeId"
);
typed_id!(
    /// Account that performed a write.
    UserId => "userId"
);
typed_id!(EmployeeId => "employeeId");
