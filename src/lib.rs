pub mod auth;
pub mod config;
pub mod db;
pub mod demo;
pub mod errors;
pub mod handlers;
pub mod listing;
pub mod models;
pub mod routes;
pub mod state;
pub mod templates_structs;
