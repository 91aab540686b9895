use async_trait::async_trait;
use chrono::Utc;
use sea_orm::entity::prelude::*;
use sea_orm::ActiveValue::{NotSet, Set};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "positions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub position_code: String,
    pub position_title: String,
    pub position_title_arabic: Option<String>,
    pub description: Option<String>,
    #[sea_orm(indexed)]
    pub department_id: Uuid,
    #[sea_orm(indexed)]
    pub reports_to_position_id: Option<Uuid>,
    #[sea_orm(indexed)]
    pub level: String,
    #[sea_orm(indexed)]
    pub job_family: Option<String>,
    pub pay_grade_id: Uuid,
    pub headcount_budget: i32,
    pub current_headcount: i32,
    #[sea_orm(indexed)]
    pub is_active: bool,
    pub effective_date: Date,
    pub end_date: Option<Date>,
    pub created_by: Uuid,
    pub updated_by: Uuid,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::department::Entity",
        from = "Column::DepartmentId",
        to = "super::department::Column::Id"
    )]
    Department,
    #[sea_orm(
        belongs_to = "Entity",
        from = "Column::ReportsToPositionId",
        to = "Column::Id"
    )]
    ReportsTo,
}

impl Related<super::department::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Department.def()
    }
}

#[async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C>(mut self, _db: &C, insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        let now: DateTimeWithTimeZone = Utc::now().into();
        if insert && matches!(self.created_at, NotSet) {
            self.created_at = Set(now);
        }
        self.updated_at = Set(now);
        Ok(self)
    }
}
