pub mod db;
pub mod filter;
pub mod memory;
pub mod models;
pub mod queries;
pub mod schema;
pub mod store;

mod error;

pub use error::Error;
pub use filter::{ForceFilter, ForceOrder, SortDirection, SortField, Window};
pub use store::{BoxFuture, EntityStore, ForceScope};

pub type Result<T, E = Error> = std::result::Result<T, E>;
