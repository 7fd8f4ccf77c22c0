pub mod context;
pub mod models;
pub mod resource;
