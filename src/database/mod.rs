pub mod accounts;
pub mod catalog;
pub mod manager;
pub mod models;
pub mod postgres;
pub mod store;

pub use manager::{DatabaseError, DatabaseManager};
pub use postgres::PgStore;
pub use store::{AccountStore, FrameFilter, MappingStore, MappingView, NewFrame, TokenStore};
