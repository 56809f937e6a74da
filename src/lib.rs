pub mod alerts;
pub mod api;
pub mod config;
pub mod db;
pub mod history;
pub mod ingest;
