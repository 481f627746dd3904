//! sea-orm entities backing the ingestion stores.

pub mod item;
pub mod item_location;
pub mod item_transaction_file;
pub mod item_warehouse;
pub mod location;
pub mod transaction_file;
pub mod transaction_file_location;
pub mod transaction_record;
pub mod warehouse;
