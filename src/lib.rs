pub mod api;
pub mod backend;
pub mod catalog;
pub mod config;
pub mod indexer;
pub mod movies;
pub mod query;
pub mod service;
