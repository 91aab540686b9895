//! HR organisation model: departments, positions and their hierarchies.
//!
//! Record shapes live in the `entity` crate; this crate owns the field rules,
//! the typed ids, the write/lookup interfaces and the sea-orm backed store.

pub mod department;
pub mod error;
pub mod hierarchy;
pub mod ids;
pub mod position;
pub mod repository;
pub mod rules;
pub mod store;

pub use department::{DEPARTMENT_RULES, Department, DepartmentChanges, NewDepartment};
pub use error::{HrError, HrResult};
pub use hierarchy::{DepartmentNode, HierarchyService};
pub use ids::{DepartmentId, EmployeeId, PayGradeId, PositionId, UserId};
pub use position::{NewPosition, POSITION_RULES, Position, PositionChanges, PositionView};
pub use repository::{
    AllowAllReferences, DepartmentStore, KnownReferences, PositionStore, ReferenceDirectory,
};
pub use store::SeaOrmHrStore;
