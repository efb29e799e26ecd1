pub mod config;
pub mod inspect;
pub mod resize;
pub mod sanitize;
