//! Geofenced time clock: field staff clock in and out only from inside a
//! configured work zone, at most once each per local day.

pub mod api;
pub mod attendance;
pub mod auth;
pub mod client;
pub mod config;
pub mod db;
pub mod docs;
pub mod geofence;
pub mod model;
pub mod models;
pub mod routes;
pub mod utils;
