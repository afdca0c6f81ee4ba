//! Film catalog service: films, users, likes and friendships.
//!
//! [`services::Catalog`] is the entry point for every operation. It validates
//! input, checks that referenced films and users exist, and delegates to the
//! storage traits in [`db`]. The [`api`] module exposes it over HTTP.

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod services;
