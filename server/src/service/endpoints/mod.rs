//! Endpoint handlers organized by domain

pub mod game;
pub mod session;
