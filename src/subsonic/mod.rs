//! Subsonic server backend

pub mod auth;
pub mod client;
pub mod models;
pub mod session;

pub use client::SubsonicClient;
pub use session::SubsonicSession;
