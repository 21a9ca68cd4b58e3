pub mod credentials;

pub use credentials::{LoginInput, RegisterInput, normalize_email, validate_email};
