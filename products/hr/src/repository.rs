//! Lookup and write interfaces for the organisation model.
//!
//! Departments and positions are resolved by the store itself. Pay grades,
//! users and employees belong to neighbouring services and are checked
//! through a [`ReferenceDirectory`].

use std::collections::HashSet;

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::{
    department::{Department, DepartmentChanges, NewDepartment},
    error::HrResult,
    ids::{DepartmentId, EmployeeId, PayGradeId, PositionId, UserId},
    position::{NewPosition, Position, PositionChanges},
};

#[async_trait]
pub trait DepartmentStore: Send + Sync {
    async fn create_department(&self, input: NewDepartment, actor: UserId) -> HrResult<Department>;

    async fn update_department(
        &self,
        id: DepartmentId,
        changes: DepartmentChanges,
        actor: UserId,
    ) -> HrResult<Department>;

    /// Soft retirement: clears `isActive` and stamps `endDate`. Rows are never removed.
    async fn retire_department(
        &self,
        id: DepartmentId,
        end_date: NaiveDate,
        actor: UserId,
    ) -> HrResult<Department>;

    async fn department(&self, id: DepartmentId) -> HrResult<Option<Department>>;

    /// Codes are normalized before the lookup, so `" eng "` finds `ENG`.
    async fn department_by_code(&self, code: &str) -> HrResult<Option<Department>>;

    async fn child_departments(&self, parent: DepartmentId) -> HrResult<Vec<Department>>;

    async fn departments_headed_by(&self, head: EmployeeId) -> HrResult<Vec<Department>>;

    async fn active_departments(&self) -> HrResult<Vec<Department>>;

    async fn departments_effective_on(&self, date: NaiveDate) -> HrResult<Vec<Department>>;
}

#[async_trait]
pub trait PositionStore: Send + Sync {
    async fn create_position(&self, input: NewPosition, actor: UserId) -> HrResult<Position>;

    async fn update_position(
        &self,
        id: PositionId,
        changes: PositionChanges,
        actor: UserId,
    ) -> HrResult<Position>;

    async fn retire_position(
        &self,
        id: PositionId,
        end_date: NaiveDate,
        actor: UserId,
    ) -> HrResult<Position>;

    async fn position(&self, id: PositionId) -> HrResult<Option<Position>>;

    async fn position_by_code(&self, code: &str) -> HrResult<Option<Position>>;

    async fn positions_in_department(&self, department: DepartmentId) -> HrResult<Vec<Position>>;

    async fn direct_reports(&self, position: PositionId) -> HrResult<Vec<Position>>;

    async fn active_positions(&self) -> HrResult<Vec<Position>>;

    async fn positions_at_level(&self, level: &str) -> HrResult<Vec<Position>>;

    async fn positions_in_job_family(&self, family: &str) -> HrResult<Vec<Position>>;

    /// Fills (`delta > 0`) or vacates (`delta < 0`) slots. The filled count
    /// never drops below zero; exceeding the budget is allowed.
    async fn adjust_headcount(
        &self,
        id: PositionId,
        delta: i32,
        actor: UserId,
    ) -> HrResult<Position>;
}

/// Existence checks for records owned by other services.
#[async_trait]
pub trait ReferenceDirectory: Send + Sync {
    async fn pay_grade_exists(&self, id: PayGradeId) -> HrResult<bool>;

    async fn user_exists(&self, id: UserId) -> HrResult<bool>;

    async fn employee_exists(&self, id: EmployeeId) -> HrResult<bool>;
}

/// Trusts every external id.
#[derive(Clone, Copy, Debug, Default)]
pub struct AllowAllReferences;

#[async_trait]
impl ReferenceDirectory for AllowAllReferences {
    async fn pay_grade_exists(&self, _id: PayGradeId) -> HrResult<bool> {
        Ok(true)
    }

    async fn user_exists(&self, _id: UserId) -> HrResult<bool> {
        Ok(true)
    }

    async fn employee_exists(&self, _id: EmployeeId) -> HrResult<bool> {
        Ok(true)
    }
}

/// Fixed in-memory directory, handy for seeding and tests.
#[derive(Clone, Debug, Default)]
pub struct KnownReferences {
    pay_grades: HashSet<PayGradeId>,
    users: HashSet<UserId>,
    employees: HashSet<EmployeeId>,
}

impl KnownReferences {
    pub fn with_pay_grade(mut self, id: PayGradeId) -> Self {
        self.pay_grades.insert(id);
        self
    }

    pub fn with_user(mut self, id: UserId) -> Self {
        self.users.insert(id);
        self
    }

    pub fn with_employee(mut self, id: EmployeeId) -> Self {
        self.employees.insert(id);
        self
    }
}

#[async_trait]
impl ReferenceDirectory for KnownReferences {
    async fn pay_grade_exists(&self, id: PayGradeId) -> HrResult<bool> {
        Ok(self.pay_grades.contains(&id))
    }

    async fn user_exists(&self, id: UserId) -> HrResult<bool> {
        Ok(self.users.contains(&id))
    }

    async fn employee_exists(&self, id: EmployeeId) -> HrResult<bool> {
        Ok(self.employees.contains(&id))
    }
}
