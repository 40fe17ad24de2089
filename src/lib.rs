pub mod audit;
pub mod config;
pub mod db;
pub mod dto;
pub mod entity;
pub mod error;
pub mod factory;
pub mod mass_assignment;
pub mod models;
pub mod repository;
pub mod response;
pub mod routes;
pub mod schema;
pub mod services;
pub mod state;
pub mod validation;
