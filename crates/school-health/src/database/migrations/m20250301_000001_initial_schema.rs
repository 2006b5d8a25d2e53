use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Create tables in order of dependencies
        self.create_students_table(manager).await?;
        self.create_schools_table(manager).await?;
        self.create_school_classes_table(manager).await?;
        self.create_enrollments_table(manager).await?;

        self.create_indexes(manager).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Enrollments::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(SchoolClasses::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Schools::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Students::Table).to_owned())
            .await?;

        Ok(())
    }
}

impl Migration {
    // Helper functions for database-specific types
    fn create_id_column(&self, manager: &SchemaManager, column: impl IntoIden) -> ColumnDef {
        let mut col = ColumnDef::new(column);
        match manager.get_database_backend() {
            sea_orm::DatabaseBackend::Postgres => col.uuid().not_null(),
            _ => col.string().not_null(),
        };
        col
    }

    fn create_date_column(&self, manager: &SchemaManager, column: impl IntoIden) -> ColumnDef {
        let mut col = ColumnDef::new(column);
        match manager.get_database_backend() {
            sea_orm::DatabaseBackend::Postgres => col.date().not_null(),
            _ => col.string().not_null(),
        };
        col
    }

    fn create_timestamp_column(&self, manager: &SchemaManager, column: impl IntoIden) -> ColumnDef {
        let mut col = ColumnDef::new(column);
        match manager.get_database_backend() {
            sea_orm::DatabaseBackend::Postgres => col.timestamp_with_time_zone().not_null(),
            _ => col.string().not_null(),
        };
        col
    }

    async fn create_students_table(&self, manager: &SchemaManager<'_>) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Students::Table)
                    .if_not_exists()
                    .col(self.create_id_column(manager, Students::Id).primary_key())
                    .col(ColumnDef::new(Students::FullName).string().not_null())
                    .col(self.create_date_column(manager, Students::BirthDate))
                    .col(ColumnDef::new(Students::Sex).string())
                    .col(ColumnDef::new(Students::Cpf).string())
                    .col(ColumnDef::new(Students::Nis).string())
                    .col(self.create_timestamp_column(manager, Students::CreatedAt))
                    .col(self.create_timestamp_column(manager, Students::UpdatedAt))
                    .to_owned(),
            )
            .await
    }

    async fn create_schools_table(&self, manager: &SchemaManager<'_>) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Schools::Table)
                    .if_not_exists()
                    .col(self.create_id_column(manager, Schools::Id).primary_key())
                    .col(
                        ColumnDef::new(Schools::Code)
                            .big_integer()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Schools::Name).string().not_null())
                    .col(self.create_timestamp_column(manager, Schools::CreatedAt))
                    .to_owned(),
            )
            .await
    }

    async fn create_school_classes_table(&self, manager: &SchemaManager<'_>) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(SchoolClasses::Table)
                    .if_not_exists()
                    .col(self.create_id_column(manager, SchoolClasses::Id).primary_key())
                    .col(self.create_id_column(manager, SchoolClasses::SchoolId))
                    .col(ColumnDef::new(SchoolClasses::Name).string().not_null())
                    .col(ColumnDef::new(SchoolClasses::Period).string().not_null())
                    .col(
                        ColumnDef::new(SchoolClasses::SchoolYear)
                            .integer()
                            .not_null(),
                    )
                    .col(self.create_timestamp_column(manager, SchoolClasses::CreatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_school_classes_school_id")
                            .from(SchoolClasses::Table, SchoolClasses::SchoolId)
                            .to(Schools::Table, Schools::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::NoAction),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn create_enrollments_table(&self, manager: &SchemaManager<'_>) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Enrollments::Table)
                    .if_not_exists()
                    .col(self.create_id_column(manager, Enrollments::Id).primary_key())
                    .col(self.create_id_column(manager, Enrollments::StudentId))
                    .col(self.create_id_column(manager, Enrollments::ClassId))
                    .col(
                        ColumnDef::new(Enrollments::SchoolYear)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Enrollments::Status)
                            .string()
                            .not_null()
                            .default("ativa"),
                    )
                    .col(self.create_timestamp_column(manager, Enrollments::CreatedAt))
                    .col(self.create_timestamp_column(manager, Enrollments::UpdatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_enrollments_student_id")
                            .from(Enrollments::Table, Enrollments::StudentId)
                            .to(Students::Table, Students::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::NoAction),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_enrollments_class_id")
                            .from(Enrollments::Table, Enrollments::ClassId)
                            .to(SchoolClasses::Table, SchoolClasses::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::NoAction),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn create_indexes(&self, manager: &SchemaManager<'_>) -> Result<(), DbErr> {
        // Student identity lookups
        manager
            .create_index(
                Index::create()
                    .name("idx_students_cpf")
                    .table(Students::Table)
                    .col(Students::Cpf)
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("idx_students_nis")
                    .table(Students::Table)
                    .col(Students::Nis)
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("idx_students_name_birth_date")
                    .table(Students::Table)
                    .col(Students::FullName)
                    .col(Students::BirthDate)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_schools_name")
                    .table(Schools::Table)
                    .col(Schools::Name)
                    .to_owned(),
            )
            .await?;

        // A class is unique per school, name, period and year
        manager
            .create_index(
                Index::create()
                    .name("idx_school_classes_identity")
                    .table(SchoolClasses::Table)
                    .col(SchoolClasses::SchoolId)
                    .col(SchoolClasses::Name)
                    .col(SchoolClasses::Period)
                    .col(SchoolClasses::SchoolYear)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_enrollments_identity")
                    .table(Enrollments::Table)
                    .col(Enrollments::StudentId)
                    .col(Enrollments::ClassId)
                    .col(Enrollments::SchoolYear)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
enum Students {
    Table,
    Id,
    FullName,
    BirthDate,
    Sex,
    Cpf,
    Nis,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Schools {
    Table,
    Id,
    Code,
    Name,
    CreatedAt,
}

#[derive(DeriveIden)]
enum SchoolClasses {
    Table,
    Id,
    SchoolId,
    Name,
    Period,
    SchoolYear,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Enrollments {
    Table,
    Id,
    StudentId,
    ClassId,
    SchoolYear,
    Status,
    CreatedAt,
    UpdatedAt,
}
