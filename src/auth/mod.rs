//! Authentication: password digests, login credentials, registration and
//! token sessions.

mod credentials;
mod password;
mod registration;
mod session;

pub use credentials::{parse_basic_header, verify_credentials, CredentialsError};
pub use password::{hash_password, validate_password, verify_password, PasswordError};
pub use registration::{register, RegistrationError, RegistrationRequest};
pub use session::{SessionStore, SESSION_TTL_SECS};
