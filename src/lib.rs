pub mod build_info;
pub mod config;
pub mod creator;
pub mod directory;
pub mod error;
pub mod logging;
pub mod model;
pub mod output;
pub mod remap;
pub mod run;
pub mod service;
pub mod validate;
