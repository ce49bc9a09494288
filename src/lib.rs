//! Job dispatch and field-technician tracking server.

pub mod actions;
pub mod auth;
pub mod config;
mod constants;
pub mod error;
mod handlers;
pub mod models;
pub mod server;
mod utils;

pub use config::Config;
pub use server::{app, AppState};
