//! User accounts.

pub mod models;
pub mod repository;

pub use models::{User, UserInfo};
pub use repository::UserRepository;
