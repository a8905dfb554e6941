pub mod date_repository;
pub mod option_repository;
pub mod room_repository;
pub mod user_repository;
pub mod vote_repository;

pub use date_repository::*;
pub use option_repository::*;
pub use room_repository::*;
pub use user_repository::*;
pub use vote_repository::*;
