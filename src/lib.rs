pub mod cli;
pub mod config;
pub mod controller;
pub mod domain;
pub mod dump;
pub mod engine;
pub mod filters;
pub mod inputter;
pub mod model;
pub mod pagination;
pub mod record;
pub mod source;
pub mod ui;
pub mod views;
