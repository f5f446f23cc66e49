pub mod address;
pub mod config;
pub mod explorer;
pub mod models;
pub mod view;
