//! Multi-account retirement projection engine with an HTTP and CLI front end.

pub mod api;
pub mod core;
