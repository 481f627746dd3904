use anyhow::Result;
use sea_orm::{ConnectOptions, Database};
use sea_orm_migration::prelude::*;
use std::time::Duration;
use tracing::{error, info};

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240101_000001_create_warehouse_tables::Migration),
            Box::new(m20240101_000002_create_transaction_tables::Migration),
            Box::new(m20240101_000003_create_link_tables::Migration),
        ]
    }
}

mod m20240101_000001_create_warehouse_tables {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000001_create_warehouse_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Warehouses::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Warehouses::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Warehouses::CompanyId).uuid().not_null())
                        .col(ColumnDef::new(Warehouses::Name).string().not_null())
                        .col(
                            ColumnDef::new(Warehouses::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Warehouses::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Locations::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Locations::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Locations::WarehouseId).uuid().not_null())
                        .col(ColumnDef::new(Locations::LocationPath).string().not_null())
                        .col(ColumnDef::new(Locations::LocationNamePath).string().not_null())
                        .col(
                            ColumnDef::new(Locations::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Locations::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_locations_warehouse_id")
                                .from(Locations::Table, Locations::WarehouseId)
                                .to(Warehouses::Table, Warehouses::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            // One location per path within a warehouse
            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_locations_warehouse_path")
                        .table(Locations::Table)
                        .col(Locations::WarehouseId)
                        .col(Locations::LocationPath)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Items::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Items::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Items::CompanyId).uuid().not_null())
                        .col(ColumnDef::new(Items::Name).string().not_null())
                        .col(
                            ColumnDef::new(Items::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Items::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            // One item per name within a company
            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_items_company_name")
                        .table(Items::Table)
                        .col(Items::CompanyId)
                        .col(Items::Name)
                        .unique()
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Items::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Locations::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Warehouses::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub enum Warehouses {
        Table,
        Id,
        CompanyId,
        Name,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    pub enum Locations {
        Table,
        Id,
        WarehouseId,
        LocationPath,
        LocationNamePath,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    pub enum Items {
        Table,
        Id,
        CompanyId,
        Name,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240101_000002_create_transaction_tables {
    use super::m20240101_000001_create_warehouse_tables::{Items, Locations, Warehouses};
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000002_create_transaction_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(TransactionFiles::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(TransactionFiles::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(TransactionFiles::CompanyId).uuid().not_null())
                        .col(ColumnDef::new(TransactionFiles::WarehouseId).uuid().not_null())
                        .col(ColumnDef::new(TransactionFiles::FileName).string().not_null())
                        .col(
                            ColumnDef::new(TransactionFiles::FileExtension)
                                .string()
                                .not_null()
                                .default(""),
                        )
                        .col(
                            ColumnDef::new(TransactionFiles::FilePathUrl)
                                .string()
                                .not_null()
                                .default(""),
                        )
                        .col(
                            ColumnDef::new(TransactionFiles::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_transaction_files_warehouse_id")
                                .from(TransactionFiles::Table, TransactionFiles::WarehouseId)
                                .to(Warehouses::Table, Warehouses::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(TransactionRecords::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(TransactionRecords::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(TransactionRecords::CompanyId).uuid().not_null())
                        .col(ColumnDef::new(TransactionRecords::WarehouseId).uuid().not_null())
                        .col(ColumnDef::new(TransactionRecords::LocationId).uuid().not_null())
                        .col(ColumnDef::new(TransactionRecords::TransactionFileId).uuid().null())
                        .col(ColumnDef::new(TransactionRecords::ItemId).uuid().not_null())
                        .col(
                            ColumnDef::new(TransactionRecords::TransactionType)
                                .string()
                                .not_null(),
                        )
                        .col(ColumnDef::new(TransactionRecords::OrderName).string().not_null())
                        .col(ColumnDef::new(TransactionRecords::Description).string().not_null())
                        .col(
                            ColumnDef::new(TransactionRecords::TransactionQuantity)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(TransactionRecords::CompletedQuantity)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(TransactionRecords::CompletedDate).date().null())
                        .col(
                            ColumnDef::new(TransactionRecords::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(TransactionRecords::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_transaction_records_location_id")
                                .from(TransactionRecords::Table, TransactionRecords::LocationId)
                                .to(Locations::Table, Locations::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_transaction_records_item_id")
                                .from(TransactionRecords::Table, TransactionRecords::ItemId)
                                .to(Items::Table, Items::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_transaction_records_transaction_file_id")
                                .from(
                                    TransactionRecords::Table,
                                    TransactionRecords::TransactionFileId,
                                )
                                .to(TransactionFiles::Table, TransactionFiles::Id)
                                .on_delete(ForeignKeyAction::SetNull),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_transaction_records_transaction_file_id")
                        .table(TransactionRecords::Table)
                        .col(TransactionRecords::TransactionFileId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_transaction_records_location_item")
                        .table(TransactionRecords::Table)
                        .col(TransactionRecords::LocationId)
                        .col(TransactionRecords::ItemId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(TransactionRecords::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(TransactionFiles::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub enum TransactionFiles {
        Table,
        Id,
        CompanyId,
        WarehouseId,
        FileName,
        FileExtension,
        FilePathUrl,
        CreatedAt,
    }

    #[derive(DeriveIden)]
    enum TransactionRecords {
        Table,
        Id,
        CompanyId,
        WarehouseId,
        LocationId,
        TransactionFileId,
        ItemId,
        TransactionType,
        OrderName,
        Description,
        TransactionQuantity,
        CompletedQuantity,
        CompletedDate,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240101_000003_create_link_tables {
    use super::m20240101_000001_create_warehouse_tables::{Items, Locations, Warehouses};
    use super::m20240101_000002_create_transaction_tables::TransactionFiles;
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000003_create_link_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(ItemsLocations::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(ItemsLocations::ItemId).uuid().not_null())
                        .col(ColumnDef::new(ItemsLocations::LocationId).uuid().not_null())
                        .primary_key(
                            Index::create()
                                .col(ItemsLocations::ItemId)
                                .col(ItemsLocations::LocationId),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_items_locations_item_id")
                                .from(ItemsLocations::Table, ItemsLocations::ItemId)
                                .to(Items::Table, Items::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_items_locations_location_id")
                                .from(ItemsLocations::Table, ItemsLocations::LocationId)
                                .to(Locations::Table, Locations::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(ItemsWarehouses::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(ItemsWarehouses::ItemId).uuid().not_null())
                        .col(ColumnDef::new(ItemsWarehouses::WarehouseId).uuid().not_null())
                        .primary_key(
                            Index::create()
                                .col(ItemsWarehouses::ItemId)
                                .col(ItemsWarehouses::WarehouseId),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_items_warehouses_item_id")
                                .from(ItemsWarehouses::Table, ItemsWarehouses::ItemId)
                                .to(Items::Table, Items::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_items_warehouses_warehouse_id")
                                .from(ItemsWarehouses::Table, ItemsWarehouses::WarehouseId)
                                .to(Warehouses::Table, Warehouses::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(TransactionFilesLocations::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(TransactionFilesLocations::TransactionFileId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(TransactionFilesLocations::LocationId)
                                .uuid()
                                .not_null(),
                        )
                        .primary_key(
                            Index::create()
                                .col(TransactionFilesLocations::TransactionFileId)
                                .col(TransactionFilesLocations::LocationId),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_transaction_files_locations_file_id")
                                .from(
                                    TransactionFilesLocations::Table,
                                    TransactionFilesLocations::TransactionFileId,
                                )
                                .to(TransactionFiles::Table, TransactionFiles::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_transaction_files_locations_location_id")
                                .from(
                                    TransactionFilesLocations::Table,
                                    TransactionFilesLocations::LocationId,
                                )
                                .to(Locations::Table, Locations::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(ItemsTransactionFiles::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(ItemsTransactionFiles::ItemId).uuid().not_null())
                        .col(
                            ColumnDef::new(ItemsTransactionFiles::TransactionFileId)
                                .uuid()
                                .not_null(),
                        )
                        .primary_key(
                            Index::create()
                                .col(ItemsTransactionFiles::ItemId)
                                .col(ItemsTransactionFiles::TransactionFileId),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_items_transaction_files_item_id")
                                .from(ItemsTransactionFiles::Table, ItemsTransactionFiles::ItemId)
                                .to(Items::Table, Items::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_items_transaction_files_file_id")
                                .from(
                                    ItemsTransactionFiles::Table,
                                    ItemsTransactionFiles::TransactionFileId,
                                )
                                .to(TransactionFiles::Table, TransactionFiles::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(ItemsTransactionFiles::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(TransactionFilesLocations::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(ItemsWarehouses::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(ItemsLocations::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum ItemsLocations {
        Table,
        ItemId,
        LocationId,
    }

    #[derive(DeriveIden)]
    enum ItemsWarehouses {
        Table,
        ItemId,
        WarehouseId,
    }

    #[derive(DeriveIden)]
    enum TransactionFilesLocations {
        Table,
        TransactionFileId,
        LocationId,
    }

    #[derive(DeriveIden)]
    enum ItemsTransactionFiles {
        Table,
        ItemId,
        TransactionFileId,
    }
}

/// Connects to `db_url` and applies every pending migration
pub async fn run_migration(db_url: &str) -> Result<()> {
    info!("Setting up database connection for migrations");

    let mut opt = ConnectOptions::new(db_url);
    opt.max_connections(2)
        .min_connections(1)
        .connect_timeout(Duration::from_secs(30))
        .acquire_timeout(Duration::from_secs(30))
        .idle_timeout(Duration::from_secs(300))
        .sqlx_logging(false);

    let db = Database::connect(opt).await?;

    info!("Running database migrations");

    match Migrator::up(&db, None).await {
        Ok(_) => {
            info!("Migrations completed successfully");
            Ok(())
        }
        Err(e) => {
            error!("Migration failed: {}", e);
            Err(e.into())
        }
    }
}
