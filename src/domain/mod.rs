pub mod phrases;
pub mod registration;
pub mod scenarios;
pub mod user;
