pub mod user;

pub use user::{normalize_name, User, UserId};
