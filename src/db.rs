pub mod error;
pub mod fire_repository;
pub mod models;
pub mod pool;

pub use error::DbError;
pub use fire_repository::FireRepository;
pub use models::*;
pub use pool::connect_lazy;
