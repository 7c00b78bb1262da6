//! fractal_form: Vórtices e Fractais data-entry form
//!
//! Serves a single-page form behind optional signed access links, checks the
//! three vórtice rows (distinct priorities, a fractal picked for each) and appends
//! them to a Google Sheets worksheet.

// Signed access links (HMAC-SHA256 over "org|exp")
pub mod auth;
pub mod config;
pub mod error;
pub mod models;
pub mod page;
// REST API module: Axum handlers for the form page and the JSON API
pub mod rest;
pub mod storage;
pub mod submission;
pub mod telemetry;
