pub mod descriptor;
pub mod error;
pub mod schema;
pub mod sqlite;
pub mod traits;

pub use descriptor::StoreDescriptor;
pub use error::StorageError;
pub use sqlite::SqliteStore;
pub use traits::*;
