pub mod config;
pub mod num;
pub mod options;
pub mod point;
pub mod settings;
pub mod transaction;
