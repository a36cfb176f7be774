pub mod file;
pub mod postgres;
pub mod sqlite;
pub mod trait_def;

pub use file::FileStorage;
pub use postgres::PostgresStorage;
pub use sqlite::SqliteStorage;
pub use trait_def::{Storage, StorageError, StorageResult, HISTORY_RETENTION};
