//! # SPG server
//! This crate hosts the HTTP server for the storefront payment gateway. It is responsible for:
//! * Authenticating storefront and admin requests with bearer tokens issued by the identity provider.
//! * Serving the cart, checkout, order and review endpoints on top of the [`spg_engine`] APIs.
//! * Receiving signed payment notifications from the payment processor and turning them into orders.
//! * Running the reaper that cancels abandoned orders.
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more information.
//!
//! ## Routes
//! The server exposes the following routes:
//! * `/health`: A health check route that returns a 200 OK response.
//! * `/payment-webhook`: Payment notifications from the payment processor. Always answers 200 once the signature
//!   checks out.
//! * `/api/...`: Everything else. These routes need a valid bearer token. See [routes](routes/index.html).

pub mod auth;
pub mod cli;
pub mod config;
pub mod data_objects;
pub mod errors;
pub mod integrations;
pub mod middleware;
pub mod payment_routes;
pub mod reaper_worker;
pub mod routes;
pub mod server;
