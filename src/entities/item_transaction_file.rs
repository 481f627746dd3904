use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "items_transaction_files")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false, column_type = "Uuid")]
    pub item_id: Uuid,
    #[sea_orm(primary_key, auto_increment = false, column_type = "Uuid")]
    pub transaction_file_id: Uuid,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::item::Entity",
        from = "Column::ItemId",
        to = "super::item::Column::Id",
        on_delete = "Cascade"
    )]
    Item,
    #[sea_orm(
        belongs_to = "super::transaction_file::Entity",
        from = "Column::TransactionFileId",
        to = "super::transaction_file::Column::Id",
        on_delete = "Cascade"
    )]
    TransactionFile,
}

impl ActiveModelBehavior for ActiveModel {}
