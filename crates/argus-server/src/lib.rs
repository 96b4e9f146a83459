//! REST front door: routes, DTOs, and shared state.

pub mod dto;
pub mod error;
pub mod routes;
pub mod state;
