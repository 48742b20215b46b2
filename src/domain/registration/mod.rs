pub mod outcome;
pub mod strategy;

pub use outcome::{classify, RegistrationOutcome};
pub use strategy::{ExtractionStrategy, RenderedPage, FLASH_CLASS, LOGIN_REDIRECT_MESSAGE};
