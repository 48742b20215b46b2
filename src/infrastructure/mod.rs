pub mod browser;
pub mod config;
pub mod db;
pub mod http;
pub mod net;
pub mod repositories;
pub mod retry;
