pub mod app_service;
pub mod commands;
pub mod config;
pub mod error;
pub mod generate;
pub mod qualify;
pub mod session;
pub mod simulation;
pub mod storage;
pub mod submission;

pub use error::{Result, WqbError};
