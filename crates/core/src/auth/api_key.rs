//! API key / session token authentication.

use async_trait::async_trait;

use super::{secrets_match, AuthError, AuthRequest, Authenticator, Identity};

/// Cookie carrying the front end's session token.
pub const SESSION_COOKIE: &str = "gatelink_session";

/// Authenticator that validates callers against a configured key.
///
/// Accepts the key in any of:
/// - `Authorization: Bearer <key>` header
/// - `X-API-Key: <key>` header
/// - `gatelink_session=<key>` cookie (browser front ends)
pub struct ApiKeyAuthenticator {
    expected_key: String,
}

impl ApiKeyAuthenticator {
    pub fn new(api_key: String) -> Self {
        Self {
            expected_key: api_key,
        }
    }

    fn extract_key<'a>(&self, request: &'a AuthRequest) -> Option<&'a str> {
        if let Some(auth_header) = request.headers.get("authorization") {
            if let Some(key) = auth_header
                .strip_prefix("Bearer ")
                .or_else(|| auth_header.strip_prefix("bearer "))
            {
                return Some(key);
            }
        }

        if let Some(key) = request.headers.get("x-api-key") {
            return Some(key.as_str());
        }

        request.cookie(SESSION_COOKIE)
    }
}

#[async_trait]
impl Authenticator for ApiKeyAuthenticator {
    async fn authenticate(&self, request: &AuthRequest) -> Result<Identity, AuthError> {
        let provided_key = self
            .extract_key(request)
            .ok_or(AuthError::NotAuthenticated)?;

        if secrets_match(provided_key, &self.expected_key) {
            Ok(Identity {
                user_id: "api_key_user".to_string(),
                method: "api_key".to_string(),
            })
        } else {
            Err(AuthError::InvalidCredentials("Invalid API key".to_string()))
        }
    }

    fn method_name(&self) -> &'static str {
        "api_key"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_request(headers: Vec<(&str, &str)>) -> AuthRequest {
        AuthRequest {
            headers: headers
                .into_iter()
                .map(|(k, v)| (k.to_lowercase(), v.to_string()))
                .collect(),
            source_ip: "127.0.0.1".parse().unwrap(),
        }
    }

    #[tokio::test]
    async fn test_bearer_token_valid() {
        let auth = ApiKeyAuthenticator::new("front-key".to_string());
        let request = make_request(vec![("Authorization", "Bearer front-key")]);

        let identity = auth.authenticate(&request).await.unwrap();
        assert_eq!(identity.method, "api_key");
    }

    #[tokio::test]
    async fn test_x_api_key_header_valid() {
        let auth = ApiKeyAuthenticator::new("front-key".to_string());
        let request = make_request(vec![("X-API-Key", "front-key")]);
        assert!(auth.authenticate(&request).await.is_ok());
    }

    #[tokio::test]
    async fn test_session_cookie_valid() {
        let auth = ApiKeyAuthenticator::new("front-key".to_string());
        let request = make_request(vec![("Cookie", "a=b; gatelink_session=front-key")]);
        assert!(auth.authenticate(&request).await.is_ok());
    }

    #[tokio::test]
    async fn test_invalid_key() {
        let auth = ApiKeyAuthenticator::new("front-key".to_string());
        let request = make_request(vec![("Authorization", "Bearer wrong-key")]);

        let result = auth.authenticate(&request).await;
        assert!(matches!(result, Err(AuthError::InvalidCredentials(_))));
    }

    #[tokio::test]
    async fn test_missing_credentials() {
        let auth = ApiKeyAuthenticator::new("front-key".to_string());
        let result = auth.authenticate(&make_request(vec![])).await;
        assert!(matches!(result, Err(AuthError::NotAuthenticated)));
    }
}
