pub mod arguments;
pub mod browser;
pub mod commands;
pub mod config;
pub mod controller;
pub mod errors;
pub mod logger;
pub mod notifications;
pub mod paths;
pub mod platform;
pub mod run;
#[cfg(feature = "telegram")]
pub mod telegram;
pub mod trading;
