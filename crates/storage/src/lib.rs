pub mod db;
pub mod export;

pub use db::{
    append_meal_entry, create_db, get_all_meal_entries, get_meal_entries_between, get_recent_meal_entries, DbPool,
    StorageError,
};
pub use export::{write_csv, CSV_HEADER};
