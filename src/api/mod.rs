mod error;
pub mod models;
mod server;
pub mod services;
pub mod state;
mod utils;

pub use error::ApiError;
pub use server::{router, run};
