//! Input validation for registration and login.

use super::AuthError;

pub const USERNAME_MIN_CHARS: usize = 3;
pub const USERNAME_MAX_CHARS: usize = 80;
pub const EMAIL_MAX_CHARS: usize = 120;
pub const PASSWORD_MIN_CHARS: usize = 6;

/// Validate a registration request.
pub fn validate_registration(username: &str, email: &str, password: &str) -> Result<(), AuthError> {
    let username_len = username.chars().count();
    if username_len == 0 {
        return Err(AuthError::ValidationError("Username is required".into()));
    }
    if !(USERNAME_MIN_CHARS..=USERNAME_MAX_CHARS).contains(&username_len) {
        return Err(AuthError::ValidationError(format!(
            "Username must be between {USERNAME_MIN_CHARS} and {USERNAME_MAX_CHARS} characters"
        )));
    }
    if email.is_empty() {
        return Err(AuthError::ValidationError("Email is required".into()));
    }
    if email.chars().count() > EMAIL_MAX_CHARS || !is_valid_email(email) {
        return Err(AuthError::ValidationError("Email format is invalid".into()));
    }
    if password.is_empty() {
        return Err(AuthError::ValidationError("Password is required".into()));
    }
    if password.chars().count() < PASSWORD_MIN_CHARS {
        return Err(AuthError::ValidationError(format!(
            "Password must be at least {PASSWORD_MIN_CHARS} characters"
        )));
    }
    Ok(())
}

/// Validate a login request. Only presence is checked here; everything else
/// is a credential mismatch.
pub fn validate_login(username: &str, password: &str) -> Result<(), AuthError> {
    if username.is_empty() || password.is_empty() {
        return Err(AuthError::ValidationError(
            "Username and password are required".into(),
        ));
    }
    Ok(())
}

/// `local@domain.tld` with no whitespace and exactly one `@`.
fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    let Some((host, tld)) = domain.rsplit_once('.') else {
        return false;
    };
    !host.is_empty() && !tld.is_empty() && !host.starts_with('.') && !host.ends_with('.')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn is_validation(result: Result<(), AuthError>) -> bool {
        matches!(result, Err(AuthError::ValidationError(_)))
    }

    #[test]
    fn accepts_valid_registration() {
        assert!(validate_registration("alice", "alice@x.com", "secret1").is_ok());
    }

    #[test]
    fn username_length_bounds() {
        assert!(is_validation(validate_registration("", "a@x.com", "secret1")));
        assert!(is_validation(validate_registration("al", "a@x.com", "secret1")));
        assert!(validate_registration("ali", "a@x.com", "secret1").is_ok());
        let max = "a".repeat(USERNAME_MAX_CHARS);
        assert!(validate_registration(&max, "a@x.com", "secret1").is_ok());
        let too_long = "a".repeat(USERNAME_MAX_CHARS + 1);
        assert!(is_validation(validate_registration(&too_long, "a@x.com", "secret1")));
    }

    #[test]
    fn email_shapes() {
        for bad in ["", "alice", "alice@", "@x.com", "alice@x", "a@b@x.com", "a b@x.com", "a@.com", "a@x."] {
            assert!(
                is_validation(validate_registration("alice", bad, "secret1")),
                "accepted {bad:?}"
            );
        }
        assert!(validate_registration("alice", "alice.smith@mail.example.org", "secret1").is_ok());
    }

    #[test]
    fn password_minimum() {
        assert!(is_validation(validate_registration("alice", "a@x.com", "")));
        assert!(is_validation(validate_registration("alice", "a@x.com", "12345")));
        assert!(validate_registration("alice", "a@x.com", "123456").is_ok());
    }

    #[test]
    fn login_requires_both_fields() {
        assert!(is_validation(validate_login("", "pw")));
        assert!(is_validation(validate_login("alice", "")));
        assert!(validate_login("alice", "pw").is_ok());
    }
}
