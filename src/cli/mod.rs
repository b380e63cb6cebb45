pub mod app;
pub mod commands;
pub mod config;
pub mod context;
pub mod convert;
pub mod dispatch;
pub mod env;
pub mod index;
pub mod output;
pub mod run;
pub mod run_step;
pub mod runtime;
pub mod validate;
