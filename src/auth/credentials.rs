//! Credential verification for login.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use thiserror::Error;
use tracing::debug;

use super::password::verify_password;
use crate::db::{DbPool, User, UserRepository};
use crate::FilesError;

/// Why a login attempt was rejected.
#[derive(Error, Debug)]
pub enum CredentialsError {
    /// Header missing, not Basic, not base64, or not `email:password`.
    #[error("malformed credentials")]
    Malformed,

    /// Unknown email or wrong password.
    #[error("invalid credentials")]
    Invalid,

    /// Store failure while looking up the user.
    #[error(transparent)]
    Store(#[from] FilesError),
}

/// Parse an `Authorization: Basic <base64(email:password)>` header value.
///
/// The password may itself contain `:`; only the first one separates.
pub fn parse_basic_header(header: &str) -> Result<(String, String), CredentialsError> {
    let encoded = header
        .strip_prefix("Basic ")
        .ok_or(CredentialsError::Malformed)?
        .trim();
    let decoded = STANDARD
        .decode(encoded)
        .map_err(|_| CredentialsError::Malformed)?;
    let decoded = String::from_utf8(decoded).map_err(|_| CredentialsError::Malformed)?;

    let (email, password) = decoded
        .split_once(':')
        .ok_or(CredentialsError::Malformed)?;
    if email.is_empty() || password.is_empty() {
        return Err(CredentialsError::Malformed);
    }

    Ok((email.to_string(), password.to_string()))
}

/// Check an email/password pair against the stored digest.
pub async fn verify_credentials(
    pool: &DbPool,
    email: &str,
    password: &str,
) -> Result<User, CredentialsError> {
    let Some(user) = UserRepository::new(pool).get_by_email(email).await? else {
        debug!("Login for unknown email");
        return Err(CredentialsError::Invalid);
    };

    verify_password(password, &user.password).map_err(|_| CredentialsError::Invalid)?;
    Ok(user)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::hash_password;
    use crate::db::{Database, NewUser};

    fn basic(raw: &str) -> String {
        format!("Basic {}", STANDARD.encode(raw))
    }

    #[test]
    fn test_parse_basic_header() {
        let (email, password) = parse_basic_header(&basic("bob@dylan.com:pw123")).unwrap();
        assert_eq!(email, "bob@dylan.com");
        assert_eq!(password, "pw123");
    }

    #[test]
    fn test_parse_basic_header_password_with_colon() {
        let (_, password) = parse_basic_header(&basic("a@b.c:x:y")).unwrap();
        assert_eq!(password, "x:y");
    }

    #[test]
    fn test_parse_basic_header_malformed() {
        for header in [
            "Bearer abc".to_string(),
            "Basic !!!not-base64".to_string(),
            basic("no-colon"),
            basic(":pw"),
            basic("a@b.c:"),
        ] {
            assert!(
                matches!(parse_basic_header(&header), Err(CredentialsError::Malformed)),
                "{header}"
            );
        }
    }

    #[tokio::test]
    async fn test_verify_credentials() {
        let db = Database::open_in_memory().await.unwrap();
        let hash = hash_password("pw123").unwrap();
        let user = UserRepository::new(db.pool())
            .create(&NewUser::new("bob@dylan.com", hash))
            .await
            .unwrap();

        let verified = verify_credentials(db.pool(), "bob@dylan.com", "pw123")
            .await
            .unwrap();
        assert_eq!(verified.id, user.id);

        assert!(matches!(
            verify_credentials(db.pool(), "bob@dylan.com", "nope").await,
            Err(CredentialsError::Invalid)
        ));
        assert!(matches!(
            verify_credentials(db.pool(), "who@dylan.com", "pw123").await,
            Err(CredentialsError::Invalid)
        ));
    }
}
