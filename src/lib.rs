pub mod api;
pub mod app;
pub mod config;
pub mod db;
pub mod export_error;
pub mod fires;
pub mod importers;
pub mod qgis2web;
pub mod services;
pub mod utils;
