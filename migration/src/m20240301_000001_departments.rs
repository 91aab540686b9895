use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Departments::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Departments::Id).uuid().not_null().primary_key())
                    .col(
                        ColumnDef::new(Departments::DepartmentCode)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Departments::DepartmentName)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Departments::DepartmentNameArabic).string())
                    .col(ColumnDef::new(Departments::Description).text())
                    .col(ColumnDef::new(Departments::ParentDepartmentId).uuid())
                    .col(ColumnDef::new(Departments::DepartmentHeadId).uuid())
                    .col(ColumnDef::new(Departments::CostCenter).string())
                    .col(
                        ColumnDef::new(Departments::IsActive)
                            .boolean()
                            .not_null()
                            .default(Expr::value(true)),
                    )
                    .col(ColumnDef::new(Departments::EffectiveDate).date().not_null())
                    .col(ColumnDef::new(Departments::EndDate).date())
                    .col(ColumnDef::new(Departments::CreatedBy).uuid().not_null())
                    .col(ColumnDef::new(Departments::UpdatedBy).uuid().not_null())
                    .col(
                        ColumnDef::new(Departments::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Departments::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_departments_parent")
                            .from(Departments::Table, Departments::ParentDepartmentId)
                            .to(Departments::Table, Departments::Id)
                            .on_delete(ForeignKeyAction::Restrict)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_departments_code")
                    .table(Departments::Table)
                    .col(Departments::DepartmentCode)
                    .unique()
                    .to_owned(),
            )
            .await?;

        let lookups = [
            ("idx_departments_parent", Departments::ParentDepartmentId),
            ("idx_departments_head", Departments::DepartmentHeadId),
            ("idx_departments_active", Departments::IsActive),
            ("idx_departments_effective_date", Departments::EffectiveDate),
        ];
        for (name, column) in lookups {
            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name(name)
                        .table(Departments::Table)
                        .col(column)
                        .to_owned(),
                )
                .await?;
        }

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Departments::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub(crate) enum Departments {
    Table,
    Id,
    DepartmentCode,
    DepartmentName,
    DepartmentNameArabic,
    Description,
    ParentDepartmentId,
    DepartmentHeadId,
    CostCenter,
    IsActive,
    EffectiveDate,
    EndDate,
    CreatedBy,
    UpdatedBy,
    CreatedAt,
    UpdatedAt,
}
