/// Redact an access code for logs: first two characters, then `***`.
pub fn mask_code(code: &str) -> String {
    let prefix: String = code.chars().take(2).collect();
    format!("{}***", prefix)
}

/// Hide the userinfo part of a connection URL (`redis://:pw@host` → `redis://***@host`).
pub fn mask_url_credentials(url: &str) -> String {
    match (url.find("://"), url.rfind('@')) {
        (Some(scheme_end), Some(at)) if at > scheme_end => {
            format!("{}***{}", &url[..scheme_end + 3], &url[at..])
        },
        _ => url.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_code() {
        assert_eq!(mask_code("demo-1234"), "de***");
        assert_eq!(mask_code("x"), "x***");
        assert_eq!(mask_code(""), "***");
    }

    #[test]
    fn test_mask_url_credentials() {
        assert_eq!(mask_url_credentials("redis://:s3cret@cache:6379/0"), "redis://***@cache:6379/0");
        assert_eq!(mask_url_credentials("rediss://user:pw@host"), "rediss://***@host");
        assert_eq!(mask_url_credentials("redis://127.0.0.1:6379"), "redis://127.0.0.1:6379");
    }
}
