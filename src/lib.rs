pub mod config;
pub mod enums;
pub mod error;
pub mod services;
pub mod api;

pub use config::Config;
pub use enums::LogoFormat;
pub use error::{ AppError, Result };
