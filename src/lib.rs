mod database {
    pub mod actions;
    pub mod composition;
    pub mod error;
    pub mod form;
    pub mod import;
    pub mod membership;
    pub mod pagination;
    pub mod schema;
    pub mod shopping;
}
mod authentication {
    pub mod cryptography;
    pub mod permissions;
}
mod config;
mod constants;
mod operations;

pub use authentication::*;
pub use config::*;
pub use constants::*;
pub use database::*;
pub use operations::*;
