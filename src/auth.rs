use base64::{engine::general_purpose, Engine as _};

/// Builds a `Proxy-Authorization` header value for the Basic scheme.
///
/// Returns `None` when either credential is absent; an anonymous upstream
/// gets no header at all.
pub fn basic_auth_header(username: Option<&str>, password: Option<&str>) -> Option<String> {
    match (username, password) {
        (Some(username), Some(password)) => {
            let credentials = format!("{}:{}", username, password);
            let encoded = general_purpose::STANDARD.encode(credentials.as_bytes());
            Some(format!("Basic {}", encoded))
        }
        _ => None,
    }
}
