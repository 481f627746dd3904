use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// One ingested row of a transaction file.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "transaction_records")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false, column_type = "Uuid")]
    pub id: Uuid,
    pub company_id: Uuid,
    pub warehouse_id: Uuid,
    pub location_id: Uuid,
    pub transaction_file_id: Option<Uuid>,
    pub item_id: Uuid,
    pub transaction_type: String,
    pub order_name: String,
    pub description: String,
    pub transaction_quantity: i32,
    pub completed_quantity: i32,
    pub completed_date: Option<Date>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::location::Entity",
        from = "Column::LocationId",
        to = "super::location::Column::Id",
        on_delete = "Cascade"
    )]
    Location,
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
        on_delete = "SetNull"
    )]
    TransactionFile,
}

impl Related<super::location::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Location.def()
    }
}

impl Related<super::item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Item.def()
    }
}

impl Related<super::transaction_file::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::TransactionFile.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
