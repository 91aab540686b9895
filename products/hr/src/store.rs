use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use entity::{department, position};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, Condition, DatabaseConnection, EntityTrait,
    QueryFilter, QueryOrder, Select, prelude::DateTimeWithTimeZone, sea_query::Expr,
};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{
    department::{
        DEPARTMENT_RULES, Department, DepartmentChanges, NewDepartment, warn_on_inverted_window,
    },
    error::{HrError, HrResult},
    ids::{DepartmentId, EmployeeId, PayGradeId, PositionId, UserId},
    position::{NewPosition, POSITION_RULES, Position, PositionChanges, warn_on_over_allocation},
    repository::{AllowAllReferences, DepartmentStore, PositionStore, ReferenceDirectory},
    rules::RuleTable,
};

/// Department and position store backed by a sea-orm connection.
///
/// Code uniqueness is checked before each write for a readable error; the
/// unique indexes created by the migrations remain the atomic guarantee and
/// their violations are mapped to the same [`HrError::DuplicateKey`].
#[derive(Clone, Debug)]
pub struct SeaOrmHrStore<R = AllowAllReferences> {
    db: DatabaseConnection,
    references: R,
}

impl SeaOrmHrStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            db,
            references: AllowAllReferences,
        }
    }
}

impl<R: ReferenceDirectory> SeaOrmHrStore<R> {
    pub fn with_references<T: ReferenceDirectory>(self, references: T) -> SeaOrmHrStore<T> {
        SeaOrmHrStore {
            db: self.db,
            references,
        }
    }

    pub fn connection(&self) -> &DatabaseConnection {
        &self.db
    }

    async fn department_model(&self, id: DepartmentId) -> HrResult<department::Model> {
        department::Entity::find_by_id(id.into_uuid())
            .one(&self.db)
            .await?
            .ok_or_else(|| HrError::NotFound {
                entity: "department",
                id: id.to_string(),
            })
    }

    async fn position_model(&self, id: PositionId) -> HrResult<position::Model> {
        position::Entity::find_by_id(id.into_uuid())
            .one(&self.db)
            .await?
            .ok_or_else(|| HrError::NotFound {
                entity: "position",
                id: id.to_string(),
            })
    }

    async fn ensure_department(&self, field: &'static str, id: DepartmentId) -> HrResult<()> {
        let found = department::Entity::find_by_id(id.into_uuid())
            .one(&self.db)
            .await?;
        if found.is_none() {
            return Err(invalid_reference(field, id));
        }
        Ok(())
    }

    async fn ensure_position(&self, field: &'static str, id: PositionId) -> HrResult<()> {
        let found = position::Entity::find_by_id(id.into_uuid())
            .one(&self.db)
            .await?;
        if found.is_none() {
            return Err(invalid_reference(field, id));
        }
        Ok(())
    }

    async fn ensure_pay_grade(&self, id: PayGradeId) -> HrResult<()> {
        if !self.references.pay_grade_exists(id).await? {
            return Err(invalid_reference("payGradeId", id));
        }
        Ok(())
    }

    async fn ensure_employee(&self, id: EmployeeId) -> HrResult<()> {
        if !self.references.employee_exists(id).await? {
            return Err(invalid_reference("departmentHeadId", id));
        }
        Ok(())
    }

    async fn ensure_actor(&self, field: &'static str, actor: UserId) -> HrResult<()> {
        if !self.references.user_exists(actor).await? {
            return Err(invalid_reference(field, actor));
        }
        Ok(())
    }

    async fn ensure_department_code_free(
        &self,
        code: &str,
        exclude: Option<DepartmentId>,
    ) -> HrResult<()> {
        self.ensure_unique::<department::Entity>(
            &DEPARTMENT_RULES,
            "departmentCode",
            department::Column::DepartmentCode,
            code,
            (department::Column::Id, exclude.map(DepartmentId::into_uuid)),
        )
        .await
    }

    async fn ensure_position_code_free(
        &self,
        code: &str,
        exclude: Option<PositionId>,
    ) -> HrResult<()> {
        self.ensure_unique::<position::Entity>(
            &POSITION_RULES,
            "positionCode",
            position::Column::PositionCode,
            code,
            (position::Column::Id, exclude.map(PositionId::into_uuid)),
        )
        .await
    }

    /// Checks `value` against `column` when the rule table marks `field` unique.
    async fn ensure_unique<E: EntityTrait>(
        &self,
        rules: &RuleTable,
        field: &'static str,
        column: E::Column,
        value: &str,
        (id_column, exclude): (E::Column, Option<Uuid>),
    ) -> HrResult<()> {
        if !rules.is_unique(field) {
            return Ok(());
        }
        let mut query = E::find().filter(column.eq(value));
        if let Some(id) = exclude {
            query = query.filter(id_column.ne(id));
        }
        if query.one(&self.db).await?.is_some() {
            return Err(HrError::DuplicateKey {
                field,
                value: value.to_string(),
            });
        }
        Ok(())
    }

    async fn departments(&self, query: Select<department::Entity>) -> HrResult<Vec<Department>> {
        let rows = query
            .order_by_asc(department::Column::DepartmentCode)
            .all(&self.db)
            .await?;
        Ok(rows.into_iter().map(Department::from).collect())
    }

    async fn positions(&self, query: Select<position::Entity>) -> HrResult<Vec<Position>> {
        let rows = query
            .order_by_asc(position::Column::PositionCode)
            .all(&self.db)
            .await?;
        Ok(rows.into_iter().map(Position::from).collect())
    }
}

#[async_trait]
impl<R: ReferenceDirectory> DepartmentStore for SeaOrmHrStore<R> {
    #[instrument(skip(self, input))]
    async fn create_department(&self, input: NewDepartment, actor: UserId) -> HrResult<Department> {
        let valid = input.validate()?;
        self.ensure_actor("createdBy", actor).await?;
        self.ensure_department_code_free(&valid.department_code, None)
            .await?;
        if let Some(parent) = valid.parent_department_id {
            self.ensure_department("parentDepartmentId", parent).await?;
        }
        if let Some(head) = valid.department_head_id {
            self.ensure_employee(head).await?;
        }

        let id = DepartmentId::generate();
        let model = valid.into_active_model(id, actor).insert(&self.db).await?;
        info!(%id, code = %model.department_code, "department created");
        Ok(model.into())
    }

    #[instrument(skip(self, changes))]
    async fn update_department(
        &self,
        id: DepartmentId,
        changes: DepartmentChanges,
        actor: UserId,
    ) -> HrResult<Department> {
        self.ensure_actor("updatedBy", actor).await?;
        let existing = self.department_model(id).await?;
        let mut active: department::ActiveModel = existing.into();
        changes.apply_to(&mut active)?;

        if let Set(code) = &active.department_code {
            self.ensure_department_code_free(code, Some(id)).await?;
        }
        if let Set(Some(parent)) = active.parent_department_id {
            self.ensure_department("parentDepartmentId", DepartmentId::from_uuid(parent))
                .await?;
        }
        if let Set(Some(head)) = active.department_head_id {
            self.ensure_employee(EmployeeId::from_uuid(head)).await?;
        }

        active.updated_by = Set(actor.into_uuid());
        let model = active.update(&self.db).await?;
        warn_on_inverted_window(&model.department_code, model.effective_date, model.end_date);
        info!(code = %model.department_code, "department updated");
        Ok(model.into())
    }

    #[instrument(skip(self))]
    async fn retire_department(
        &self,
        id: DepartmentId,
        end_date: NaiveDate,
        actor: UserId,
    ) -> HrResult<Department> {
        self.ensure_actor("updatedBy", actor).await?;
        let existing = self.department_model(id).await?;
        let mut active: department::ActiveModel = existing.into();
        active.is_active = Set(false);
        active.end_date = Set(Some(end_date));
        active.updated_by = Set(actor.into_uuid());
        let model = active.update(&self.db).await?;
        warn_on_inverted_window(&model.department_code, model.effective_date, model.end_date);
        info!(code = %model.department_code, "department retired");
        Ok(model.into())
    }

    async fn department(&self, id: DepartmentId) -> HrResult<Option<Department>> {
        let found = department::Entity::find_by_id(id.into_uuid())
            .one(&self.db)
            .await?;
        Ok(found.map(Department::from))
    }

    async fn department_by_code(&self, code: &str) -> HrResult<Option<Department>> {
        let Some(code) = DEPARTMENT_RULES.lookup_key("departmentCode", code) else {
            return Ok(None);
        };
        let found = department::Entity::find()
            .filter(department::Column::DepartmentCode.eq(code))
            .one(&self.db)
            .await?;
        Ok(found.map(Department::from))
    }

    async fn child_departments(&self, parent: DepartmentId) -> HrResult<Vec<Department>> {
        self.departments(
            department::Entity::find()
                .filter(department::Column::ParentDepartmentId.eq(parent.into_uuid())),
        )
        .await
    }

    async fn departments_headed_by(&self, head: EmployeeId) -> HrResult<Vec<Department>> {
        self.departments(
            department::Entity::find()
                .filter(department::Column::DepartmentHeadId.eq(head.into_uuid())),
        )
        .await
    }

    async fn active_departments(&self) -> HrResult<Vec<Department>> {
        self.departments(department::Entity::find().filter(department::Column::IsActive.eq(true)))
            .await
    }

    async fn departments_effective_on(&self, date: NaiveDate) -> HrResult<Vec<Department>> {
        self.departments(
            department::Entity::find()
                .filter(department::Column::IsActive.eq(true))
                .filter(department::Column::EffectiveDate.lte(date))
                .filter(
                    Condition::any()
                        .add(department::Column::EndDate.is_null())
                        .add(department::Column::EndDate.gte(date)),
                ),
        )
        .await
    }
}

#[async_trait]
impl<R: ReferenceDirectory> PositionStore for SeaOrmHrStore<R> {
    #[instrument(skip(self, input))]
    async fn create_position(&self, input: NewPosition, actor: UserId) -> HrResult<Position> {
        let valid = input.validate()?;
        self.ensure_actor("createdBy", actor).await?;
        self.ensure_position_code_free(&valid.position_code, None)
            .await?;
        self.ensure_department("departmentId", valid.department_id)
            .await?;
        if let Some(reports_to) = valid.reports_to_position_id {
            self.ensure_position("reportsToPositionId", reports_to)
                .await?;
        }
        self.ensure_pay_grade(valid.pay_grade_id).await?;

        let id = PositionId::generate();
        let model = valid.into_active_model(id, actor).insert(&self.db).await?;
        info!(%id, code = %model.position_code, "position created");
        Ok(model.into())
    }

    #[instrument(skip(self, changes))]
    async fn update_position(
        &self,
        id: PositionId,
        changes: PositionChanges,
        actor: UserId,
    ) -> HrResult<Position> {
        self.ensure_actor("updatedBy", actor).await?;
        let existing = self.position_model(id).await?;
        let mut active: position::ActiveModel = existing.into();
        changes.apply_to(&mut active)?;

        if let Set(code) = &active.position_code {
            self.ensure_position_code_free(code, Some(id)).await?;
        }
        if let Set(department) = active.department_id {
            self.ensure_department("departmentId", DepartmentId::from_uuid(department))
                .await?;
        }
        if let Set(Some(reports_to)) = active.reports_to_position_id {
            self.ensure_position("reportsToPositionId", PositionId::from_uuid(reports_to))
                .await?;
        }
        if let Set(pay_grade) = active.pay_grade_id {
            self.ensure_pay_grade(PayGradeId::from_uuid(pay_grade))
                .await?;
        }

        active.updated_by = Set(actor.into_uuid());
        let model = active.update(&self.db).await?;
        warn_on_over_allocation(
            &model.position_code,
            model.headcount_budget,
            model.current_headcount,
        );
        warn_on_inverted_window(&model.position_code, model.effective_date, model.end_date);
        info!(code = %model.position_code, "position updated");
        Ok(model.into())
    }

    #[instrument(skip(self))]
    async fn retire_position(
        &self,
        id: PositionId,
        end_date: NaiveDate,
        actor: UserId,
    ) -> HrResult<Position> {
        self.ensure_actor("updatedBy", actor).await?;
        let existing = self.position_model(id).await?;
        let mut active: position::ActiveModel = existing.into();
        active.is_active = Set(false);
        active.end_date = Set(Some(end_date));
        active.updated_by = Set(actor.into_uuid());
        let model = active.update(&self.db).await?;
        warn_on_inverted_window(&model.position_code, model.effective_date, model.end_date);
        info!(code = %model.position_code, "position retired");
        Ok(model.into())
    }

    async fn position(&self, id: PositionId) -> HrResult<Option<Position>> {
        let found = position::Entity::find_by_id(id.into_uuid())
            .one(&self.db)
            .await?;
        Ok(found.map(Position::from))
    }

    async fn position_by_code(&self, code: &str) -> HrResult<Option<Position>> {
        let Some(code) = POSITION_RULES.lookup_key("positionCode", code) else {
            return Ok(None);
        };
        let found = position::Entity::find()
            .filter(position::Column::PositionCode.eq(code))
            .one(&self.db)
            .await?;
        Ok(found.map(Position::from))
    }

    async fn positions_in_department(&self, department: DepartmentId) -> HrResult<Vec<Position>> {
        self.positions(
            position::Entity::find()
                .filter(position::Column::DepartmentId.eq(department.into_uuid())),
        )
        .await
    }

    async fn direct_reports(&self, position: PositionId) -> HrResult<Vec<Position>> {
        self.positions(
            position::Entity::find()
                .filter(position::Column::ReportsToPositionId.eq(position.into_uuid())),
        )
        .await
    }

    async fn active_positions(&self) -> HrResult<Vec<Position>> {
        self.positions(position::Entity::find().filter(position::Column::IsActive.eq(true)))
            .await
    }

    async fn positions_at_level(&self, level: &str) -> HrResult<Vec<Position>> {
        let Some(level) = POSITION_RULES.lookup_key("level", level) else {
            return Ok(Vec::new());
        };
        self.positions(position::Entity::find().filter(position::Column::Level.eq(level)))
            .await
    }

    async fn positions_in_job_family(&self, family: &str) -> HrResult<Vec<Position>> {
        self.positions(position::Entity::find().filter(position::Column::JobFamily.eq(family)))
            .await
    }

    #[instrument(skip(self))]
    async fn adjust_headcount(
        &self,
        id: PositionId,
        delta: i32,
        actor: UserId,
    ) -> HrResult<Position> {
        self.ensure_actor("updatedBy", actor).await?;
        let out_of_range = || {
            HrError::mismatch(
                "currentHeadcount",
                format!("adjusting filled slots by {delta} leaves the valid range"),
            )
        };
        let floor = delta.checked_neg().ok_or_else(out_of_range)?;
        let ceiling = i32::MAX.checked_sub(delta.max(0)).ok_or_else(out_of_range)?;

        // Applied in the database so concurrent fills and vacates accumulate.
        let now: DateTimeWithTimeZone = Utc::now().into();
        let result = position::Entity::update_many()
            .col_expr(
                position::Column::CurrentHeadcount,
                Expr::col(position::Column::CurrentHeadcount).add(delta),
            )
            .col_expr(position::Column::UpdatedBy, Expr::value(actor.into_uuid()))
            .col_expr(position::Column::UpdatedAt, Expr::value(now))
            .filter(position::Column::Id.eq(id.into_uuid()))
            .filter(position::Column::CurrentHeadcount.gte(floor))
            .filter(position::Column::CurrentHeadcount.lte(ceiling))
            .exec(&self.db)
            .await?;

        let model = self.position_model(id).await?;
        if result.rows_affected == 0 {
            warn!(current = model.current_headcount, delta, "headcount adjustment refused");
            return Err(out_of_range());
        }
        warn_on_over_allocation(
            &model.position_code,
            model.headcount_budget,
            model.current_headcount,
        );
        info!(code = %model.position_code, current = model.current_headcount, "headcount adjusted");
        Ok(model.into())
    }
}

fn invalid_reference(field: &'static str, id: impl Into<Uuid>) -> HrError {
    HrError::InvalidReference {
        field,
        detail: id.into().to_string(),
    }
}
