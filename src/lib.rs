pub mod account;
pub mod api;
pub mod common;
pub mod directory;
pub mod session;
pub mod ui;
