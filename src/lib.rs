pub mod auth;
pub mod banner;
pub mod cache;
pub mod config;
pub mod consts;
pub mod engine;
pub mod epub;
pub mod error;
pub mod markup;
pub mod painter;
pub mod planner;
pub mod prompts;
pub mod spinner;
