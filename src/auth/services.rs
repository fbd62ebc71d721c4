use crate::auth::dto::Credentials;

/// Trims both fields; `None` when either ends up blank.
pub(crate) fn normalize_credentials(creds: Credentials) -> Option<(String, String)> {
    let email = creds.email.trim().to_string();
    let password = creds.password.trim().to_string();
    if email.is_empty() || password.is_empty() {
        return None;
    }
    Some((email, password))
}
