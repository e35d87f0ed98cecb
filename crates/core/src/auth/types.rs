use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::net::IpAddr;

/// Request information for authentication
#[derive(Debug, Clone)]
pub struct AuthRequest {
    /// Header names are lowercase.
    pub headers: HashMap<String, String>,
    pub source_ip: IpAddr,
}

impl AuthRequest {
    /// Value of a cookie from the `Cookie` header, if present.
    pub fn cookie(&self, name: &str) -> Option<&str> {
        let header = self.headers.get("cookie")?;
        header.split(';').find_map(|pair| {
            let (key, value) = pair.trim().split_once('=')?;
            (key == name).then_some(value)
        })
    }
}

/// Authenticated front-end caller
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Identity {
    pub user_id: String,
    pub method: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request_with_cookie(cookie: &str) -> AuthRequest {
        let mut headers = HashMap::new();
        headers.insert("cookie".to_string(), cookie.to_string());
        AuthRequest {
            headers,
            source_ip: "127.0.0.1".parse().unwrap(),
        }
    }

    #[test]
    fn test_cookie_lookup() {
        let request = request_with_cookie("theme=dark; gatelink_session=abc123; lang=id");
        assert_eq!(request.cookie("gatelink_session"), Some("abc123"));
        assert_eq!(request.cookie("theme"), Some("dark"));
        assert_eq!(request.cookie("missing"), None);
    }

    #[test]
    fn test_cookie_lookup_without_header() {
        let request = AuthRequest {
            headers: HashMap::new(),
            source_ip: "127.0.0.1".parse().unwrap(),
        };
        assert_eq!(request.cookie("gatelink_session"), None);
    }
}
