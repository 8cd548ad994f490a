//! Shared request, response, and view types for the vidhub services.

pub mod api;
pub mod models;
pub mod pagination;
