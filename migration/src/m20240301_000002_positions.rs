use sea_orm_migration::prelude::*;

use crate::m20240301_000001_departments::Departments;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Positions::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Positions::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Positions::PositionCode).string().not_null())
                    .col(
                        ColumnDef::new(Positions::PositionTitle)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Positions::PositionTitleArabic).string())
                    .col(ColumnDef::new(Positions::Description).text())
                    .col(ColumnDef::new(Positions::DepartmentId).uuid().not_null())
                    .col(ColumnDef::new(Positions::ReportsToPositionId).uuid())
                    .col(ColumnDef::new(Positions::Level).string().not_null())
                    .col(ColumnDef::new(Positions::JobFamily).string())
                    .col(ColumnDef::new(Positions::PayGradeId).uuid().not_null())
                    .col(
                        ColumnDef::new(Positions::HeadcountBudget)
                            .integer()
                            .not_null()
                            .default(Expr::value(1)),
                    )
                    .col(
                        ColumnDef::new(Positions::CurrentHeadcount)
                            .integer()
                            .not_null()
                            .default(Expr::value(0)),
                    )
                    .col(
                        ColumnDef::new(Positions::IsActive)
                            .boolean()
                            .not_null()
                            .default(Expr::value(true)),
                    )
                    .col(ColumnDef::new(Positions::EffectiveDate).date().not_null())
                    .col(ColumnDef::new(Positions::EndDate).date())
                    .col(ColumnDef::new(Positions::CreatedBy).uuid().not_null())
                    .col(ColumnDef::new(Positions::UpdatedBy).uuid().not_null())
                    .col(
                        ColumnDef::new(Positions::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Positions::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_positions_department")
                            .from(Positions::Table, Positions::DepartmentId)
                            .to(Departments::Table, Departments::Id)
                            .on_delete(ForeignKeyAction::Restrict)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_positions_reports_to")
                            .from(Positions::Table, Positions::ReportsToPositionId)
                            .to(Positions::Table, Positions::Id)
                            .on_delete(ForeignKeyAction::SetNull)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_positions_code")
                    .table(Positions::Table)
                    .col(Positions::PositionCode)
                    .unique()
                    .to_owned(),
            )
            .await?;

        let lookups = [
            ("idx_positions_department", Positions::DepartmentId),
            ("idx_positions_reports_to", Positions::ReportsToPositionId),
            ("idx_positions_active", Positions::IsActive),
            ("idx_positions_level", Positions::Level),
            ("idx_positions_job_family", Positions::JobFamily),
        ];
        for (name, column) in lookups {
            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name(name)
                        .table(Positions::Table)
                        .col(column)
                        .to_owned(),
                )
                .await?;
        }

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Positions::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Positions {
    Table,
    Id,
    PositionCode,
    PositionTitle,
    PositionTitleArabic,
    Description,
    DepartmentId,
    ReportsToPositionId,
    Level,
    JobFamily,
    PayGradeId,
    HeadcountBudget,
    CurrentHeadcount,
    IsActive,
    EffectiveDate,
    EndDate,
    CreatedBy,
    UpdatedBy,
    CreatedAt,
    UpdatedAt,
}
