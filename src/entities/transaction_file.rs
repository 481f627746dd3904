use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// An uploaded transaction file.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "transaction_files")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false, column_type = "Uuid")]
    pub id: Uuid,
    pub company_id: Uuid,
    pub warehouse_id: Uuid,
    pub file_name: String,
    pub file_extension: String,
    pub file_path_url: String,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::warehouse::Entity",
        from = "Column::WarehouseId",
        to = "super::warehouse::Column::Id",
        on_delete = "Cascade"
    )]
    Warehouse,
    #[sea_orm(has_many = "super::transaction_record::Entity")]
    TransactionRecords,
}

impl Related<super::warehouse::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Warehouse.def()
    }
}

impl Related<super::transaction_record::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::TransactionRecords.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
