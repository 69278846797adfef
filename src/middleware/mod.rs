/*
 * Responsibility
 * - Public interface of the middleware layers applied in app.rs
 */
pub mod cors;
pub mod http;
