//! Bootstrap module for initializing the anistream server
//!
//! This module handles:
//! - Configuration loading
//! - Provider registry construction
//! - Service initialization and dependency injection

pub mod config;
pub mod providers;

pub use config::load_config;
pub use providers::{build_registry, init_services, Services};
