pub mod model;

pub use model::{Credentials, RegistrationForm, UserRecord};
