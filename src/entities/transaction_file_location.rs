use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "transaction_files_locations")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false, column_type = "Uuid")]
    pub transaction_file_id: Uuid,
    #[sea_orm(primary_key, auto_increment = false, column_type = "Uuid")]
    pub location_id: Uuid,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::transaction_file::Entity",
        from = "Column::TransactionFileId",
        to = "super::transaction_file::Column::Id",
        on_delete = "Cascade"
    )]
    TransactionFile,
    #[sea_orm(
        belongs_to = "super::location::Entity",
        from = "Column::LocationId",
        to = "super::location::Column::Id",
        on_delete = "Cascade"
    )]
    Location,
}

impl ActiveModelBehavior for ActiveModel {}
