//! Black-box acceptance harness for MiniTwit deployments.
//!
//! HTTP scenarios drive the application through its HTML endpoints; browser
//! scenarios register through the rendered form and verify the row in
//! PostgreSQL, whatever shape the schema takes.

pub mod domain;
pub mod error;
pub mod infrastructure;
