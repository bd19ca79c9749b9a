pub mod campaign;
pub mod config;
pub mod import;
pub mod submit;
pub mod table;
