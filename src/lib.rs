pub mod config;
pub mod data;
pub mod db;
pub mod error;
pub mod price;

pub use error::{Entity, RepoError};
pub use price::Price;
