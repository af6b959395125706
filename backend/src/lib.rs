pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod events;
pub mod guard;
pub mod identity;
pub mod models;
pub mod profiles;
pub mod routes;
pub mod state;
pub mod validation;

pub use error::{AppError, IdentityError};
