// Library exports shared by the server binary and integration tests
pub mod config;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod security;
pub mod services;
