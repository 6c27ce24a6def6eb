use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240601_000001_create_reference_tables::Migration),
            Box::new(m20240601_000002_create_container_types_table::Migration),
            Box::new(m20240601_000003_create_orders_table::Migration),
            Box::new(m20240601_000004_create_order_documents_table::Migration),
            Box::new(m20240601_000005_create_users_table::Migration),
        ]
    }
}

/// Names of the tables sharing the contact record shape.
pub const REFERENCE_TABLES: [&str; 3] = ["suppliers", "carriers", "destinations"];

/// Container types every fresh database starts with.
pub const SEEDED_CONTAINER_TYPES: [&str; 7] = [
    "20ft",
    "20ft HC",
    "40ft",
    "40ft HC",
    "45ft HC",
    "20ft Reefer",
    "40ft Reefer",
];

mod m20240601_000001_create_reference_tables {
    use super::REFERENCE_TABLES;
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240601_000001_create_reference_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            // suppliers, carriers and destinations share one column layout
            for table in REFERENCE_TABLES {
                manager
                    .create_table(
                        Table::create()
                            .table(Alias::new(table))
                            .if_not_exists()
                            .col(
                                ColumnDef::new(Contact::Id)
                                    .uuid()
                                    .primary_key()
                                    .not_null(),
                            )
                            .col(ColumnDef::new(Contact::Name).string().not_null())
                            .col(ColumnDef::new(Contact::Address).string().null())
                            .col(ColumnDef::new(Contact::Country).string().null())
                            .col(ColumnDef::new(Contact::Email).string().null())
                            .col(ColumnDef::new(Contact::Phone).string().null())
                            .col(
                                ColumnDef::new(Contact::CreatedAt)
                                    .timestamp_with_time_zone()
                                    .not_null(),
                            )
                            .col(
                                ColumnDef::new(Contact::UpdatedAt)
                                    .timestamp_with_time_zone()
                                    .not_null(),
                            )
                            .to_owned(),
                    )
                    .await?;

                manager
                    .create_index(
                        Index::create()
                            .if_not_exists()
                            .name(format!("idx_{}_name", table))
                            .table(Alias::new(table))
                            .col(Contact::Name)
                            .to_owned(),
                    )
                    .await?;
            }
            Ok(())
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            for table in REFERENCE_TABLES.iter().rev() {
                manager
                    .drop_table(Table::drop().table(Alias::new(*table)).to_owned())
                    .await?;
            }
            Ok(())
        }
    }

    #[derive(DeriveIden)]
    enum Contact {
        Id,
        Name,
        Address,
        Country,
        Email,
        Phone,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240601_000002_create_container_types_table {
    use super::SEEDED_CONTAINER_TYPES;
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240601_000002_create_container_types_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(ContainerTypes::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(ContainerTypes::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ContainerTypes::Name)
                                .string_len(64)
                                .not_null()
                                .unique_key(),
                        )
                        .to_owned(),
                )
                .await?;

            let mut insert = Query::insert();
            insert
                .into_table(ContainerTypes::Table)
                .columns([ContainerTypes::Id, ContainerTypes::Name]);
            for name in SEEDED_CONTAINER_TYPES {
                insert
                    .values([uuid::Uuid::new_v4().into(), name.into()])
                    .map_err(|e| DbErr::Migration(e.to_string()))?;
            }
            manager.exec_stmt(insert).await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(ContainerTypes::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum ContainerTypes {
        Table,
        Id,
        Name,
    }
}

mod m20240601_000003_create_orders_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240601_000003_create_orders_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Orders::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Orders::Id).uuid().primary_key().not_null())
                        .col(
                            ColumnDef::new(Orders::Reference)
                                .string()
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(Orders::SupplierId).uuid().not_null())
                        .col(ColumnDef::new(Orders::DestinationId).uuid().not_null())
                        .col(ColumnDef::new(Orders::CarrierId).uuid().not_null())
                        .col(ColumnDef::new(Orders::ProductDescription).text().null())
                        .col(ColumnDef::new(Orders::ContainerType).string_len(64).not_null())
                        .col(ColumnDef::new(Orders::ContainerReference).string().null())
                        .col(ColumnDef::new(Orders::TransportPrice).decimal_len(14, 2).null())
                        .col(ColumnDef::new(Orders::OrderValue).decimal_len(14, 2).null())
                        .col(
                            ColumnDef::new(Orders::Status)
                                .string_len(32)
                                .not_null()
                                .default("pending"),
                        )
                        .col(
                            ColumnDef::new(Orders::OrderDate)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Orders::ExpectedStartDate)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Orders::InitialPaymentDate)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(Orders::InitialPaymentAmount)
                                .decimal_len(14, 2)
                                .null(),
                        )
                        .col(
                            ColumnDef::new(Orders::FinalPaymentDate)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(Orders::FinalPaymentAmount)
                                .decimal_len(14, 2)
                                .null(),
                        )
                        .col(ColumnDef::new(Orders::Etd).timestamp_with_time_zone().null())
                        .col(ColumnDef::new(Orders::Eta).timestamp_with_time_zone().null())
                        .col(ColumnDef::new(Orders::Ata).timestamp_with_time_zone().null())
                        .col(
                            ColumnDef::new(Orders::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Orders::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_orders_supplier_id")
                                .from(Orders::Table, Orders::SupplierId)
                                .to(Alias::new("suppliers"), Alias::new("id"))
                                .on_delete(ForeignKeyAction::Restrict)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_orders_destination_id")
                                .from(Orders::Table, Orders::DestinationId)
                                .to(Alias::new("destinations"), Alias::new("id"))
                                .on_delete(ForeignKeyAction::Restrict)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_orders_carrier_id")
                                .from(Orders::Table, Orders::CarrierId)
                                .to(Alias::new("carriers"), Alias::new("id"))
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
                        .name("idx_orders_status")
                        .table(Orders::Table)
                        .col(Orders::Status)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_orders_order_date")
                        .table(Orders::Table)
                        .col(Orders::OrderDate)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_orders_carrier_id")
                        .table(Orders::Table)
                        .col(Orders::CarrierId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Orders::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum Orders {
        Table,
        Id,
        Reference,
        SupplierId,
        DestinationId,
        CarrierId,
        ProductDescription,
        ContainerType,
        ContainerReference,
        TransportPrice,
        OrderValue,
        Status,
        OrderDate,
        ExpectedStartDate,
        InitialPaymentDate,
        InitialPaymentAmount,
        FinalPaymentDate,
        FinalPaymentAmount,
        Etd,
        Eta,
        Ata,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240601_000004_create_order_documents_table {
    use super::m20240601_000003_create_orders_table::Orders;
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240601_000004_create_order_documents_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(OrderDocuments::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(OrderDocuments::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(OrderDocuments::OrderId).uuid().not_null())
                        .col(ColumnDef::new(OrderDocuments::Name).string().not_null())
                        .col(ColumnDef::new(OrderDocuments::FileUrl).string().not_null())
                        .col(
                            ColumnDef::new(OrderDocuments::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_order_documents_order_id")
                                .from(OrderDocuments::Table, OrderDocuments::OrderId)
                                .to(Orders::Table, Orders::Id)
                                .on_delete(ForeignKeyAction::Cascade)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_order_documents_order_id")
                        .table(OrderDocuments::Table)
                        .col(OrderDocuments::OrderId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(OrderDocuments::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum OrderDocuments {
        Table,
        Id,
        OrderId,
        Name,
        FileUrl,
        CreatedAt,
    }
}

mod m20240601_000005_create_users_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240601_000005_create_users_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Users::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Users::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Users::Name).string().not_null())
                        .col(
                            ColumnDef::new(Users::Email)
                                .string()
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(Users::PasswordHash).string().not_null())
                        .col(
                            ColumnDef::new(Users::Role)
                                .string_len(32)
                                .not_null()
                                .default("operator"),
                        )
                        .col(
                            ColumnDef::new(Users::Active)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(
                            ColumnDef::new(Users::ConfirmedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(Users::LastSignInAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(Users::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Users::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Users::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Users {
        Table,
        Id,
        Name,
        Email,
        PasswordHash,
        Role,
        Active,
        ConfirmedAt,
        LastSignInAt,
        CreatedAt,
        UpdatedAt,
    }
}
