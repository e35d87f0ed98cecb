//! Console implementation over plain HTTP.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::config::ConsoleConfig;

use super::scrape;
use super::{
    CodePayload, ConnectionMethod, ConsoleConnector, ConsoleCredentials, ConsoleError,
    ConsoleSession, ControlToggle, DeviceEntry, LoginOutcome,
};

/// Connector that opens HTTP sessions against the console.
pub struct WebConsole {
    config: ConsoleConfig,
}

impl WebConsole {
    pub fn new(config: ConsoleConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl ConsoleConnector for WebConsole {
    fn name(&self) -> &str {
        "web"
    }

    async fn open(&self) -> Result<Box<dyn ConsoleSession>, ConsoleError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(self.config.request_timeout_secs as u64))
            .cookie_store(true)
            .user_agent(self.config.user_agent.clone())
            .build()
            .map_err(|e| ConsoleError::Internal(format!("failed to build HTTP client: {}", e)))?;

        debug!(base_url = %self.config.base_url, "Opened console session");

        Ok(Box::new(WebConsoleSession {
            config: self.config.clone(),
            client: RwLock::new(Some(client)),
            csrf: RwLock::new(None),
            method: RwLock::new(None),
        }))
    }
}

/// One cookie jar, one job.
pub struct WebConsoleSession {
    config: ConsoleConfig,
    /// `None` once released.
    client: RwLock<Option<Client>>,
    /// Latest CSRF token seen on a page.
    csrf: RwLock<Option<String>>,
    /// Method chosen by `select_method`, consumed by `read_code`.
    method: RwLock<Option<ConnectionMethod>>,
}

impl WebConsoleSession {
    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    async fn client(&self) -> Result<Client, ConsoleError> {
        self.client.read().await.clone().ok_or(ConsoleError::Released)
    }

    /// GET a page, remembering its CSRF token.
    async fn get_page(&self, path: &str) -> Result<(String, String), ConsoleError> {
        let response = self.client().await?.get(self.url(path)).send().await?;
        let (location, body) = read_page(response).await?;
        if let Some(token) = scrape::csrf_token(&body) {
            *self.csrf.write().await = Some(token);
        }
        Ok((location, body))
    }

    async fn post_form(&self, path: &str, form: &[(&str, String)]) -> Result<Response, ConsoleError> {
        let mut request = self.client().await?.post(self.url(path)).form(form);
        if let Some(token) = self.csrf.read().await.as_ref() {
            request = request.header("X-CSRF-TOKEN", token.as_str());
        }
        Ok(request.send().await?)
    }

    /// Fail when a page navigation bounced us back to the login form.
    fn ensure_authenticated(&self, location: &str) -> Result<(), ConsoleError> {
        if location.contains(&self.config.login_path) {
            return Err(ConsoleError::UnexpectedPage(format!(
                "redirected to login at {}",
                location
            )));
        }
        Ok(())
    }
}

async fn read_page(response: Response) -> Result<(String, String), ConsoleError> {
    let status = response.status();
    let location = response.url().path().to_string();
    if !status.is_success() {
        return Err(ConsoleError::UnexpectedPage(format!(
            "HTTP {} at {}",
            status, location
        )));
    }
    let body = response.text().await?;
    Ok((location, body))
}

#[async_trait]
impl ConsoleSession for WebConsoleSession {
    async fn fetch_challenge(&self) -> Result<String, ConsoleError> {
        let (_, body) = self.get_page(&self.config.login_path).await?;
        scrape::challenge_text(&body)
    }

    async fn submit_login(
        &self,
        credentials: &ConsoleCredentials,
        answer: i64,
    ) -> Result<LoginOutcome, ConsoleError> {
        let mut form = vec![
            ("username", credentials.username.clone()),
            ("password", credentials.password.clone()),
            ("captcha", answer.to_string()),
        ];
        if let Some(token) = self.csrf.read().await.clone() {
            form.push(("_token", token));
        }

        let response = self.post_form(&self.config.login_path, &form).await?;
        if response.status().is_client_error() {
            return Err(ConsoleError::LoginRejected(format!(
                "HTTP {}",
                response.status()
            )));
        }
        let (location, _) = read_page(response).await?;
        Ok(LoginOutcome { location })
    }

    async fn select_method(&self, method: &ConnectionMethod) -> Result<(), ConsoleError> {
        let (location, _) = self.get_page(&self.config.devices_path).await?;
        self.ensure_authenticated(&location)?;
        *self.method.write().await = Some(method.clone());
        Ok(())
    }

    async fn read_code(&self) -> Result<CodePayload, ConsoleError> {
        let method = self
            .method
            .read()
            .await
            .clone()
            .ok_or_else(|| ConsoleError::Internal("no connection method selected".to_string()))?;

        let mut form = vec![("connectionMethod", method.as_str().to_string())];
        if let ConnectionMethod::Pairing { phone_number } = &method {
            form.push(("phoneNumber", phone_number.clone()));
        }

        let response = self.post_form(&self.config.api_path, &form).await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            warn!(%status, "Console code request failed");
            return Err(ConsoleError::Rejected(format!("HTTP {}", status)));
        }
        scrape::code_response(&body, &method)
    }

    async fn list_devices(&self) -> Result<Vec<DeviceEntry>, ConsoleError> {
        let (location, body) = self.get_page(&self.config.devices_path).await?;
        self.ensure_authenticated(&location)?;
        Ok(scrape::device_list(&body))
    }

    async fn toggle_control(&self, toggle: &ControlToggle) -> Result<(), ConsoleError> {
        let form = [
            ("id", toggle.external_id.clone()),
            ("field", toggle.control.field().to_string()),
            ("value", toggle.value.clone()),
        ];
        let response = self.post_form(&self.config.settings_path, &form).await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ConsoleError::Rejected(format!("HTTP {}", status)));
        }

        // Some console versions answer 200 with {"error":"1","msg":...}.
        let body = response.text().await.unwrap_or_default();
        if let Ok(value) = serde_json::from_str::<serde_json::Value>(&body) {
            let failed = matches!(value.get("error"), Some(serde_json::Value::String(s)) if s != "0");
            if failed {
                let msg = value
                    .get("msg")
                    .and_then(|m| m.as_str())
                    .unwrap_or("setting rejected");
                return Err(ConsoleError::Rejected(msg.to_string()));
            }
        }
        Ok(())
    }

    async fn release(&self) -> Result<(), ConsoleError> {
        let released = self.client.write().await.take();
        if released.is_none() {
            return Err(ConsoleError::Released);
        }
        debug!("Released console session");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ConsoleConfig {
        toml::from_str(r#"base_url = "http://127.0.0.1:9/""#).unwrap()
    }

    #[tokio::test]
    async fn test_url_joins_without_double_slash() {
        let connector = WebConsole::new(config());
        assert_eq!(connector.name(), "web");
        let session = WebConsoleSession {
            config: config(),
            client: RwLock::new(None),
            csrf: RwLock::new(None),
            method: RwLock::new(None),
        };
        assert_eq!(session.url("/login"), "http://127.0.0.1:9/login");
    }

    #[tokio::test]
    async fn test_release_is_single_shot() {
        let connector = WebConsole::new(config());
        let session = connector.open().await.unwrap();
        assert!(session.release().await.is_ok());
        assert!(matches!(session.release().await, Err(ConsoleError::Released)));
        assert!(matches!(
            session.list_devices().await,
            Err(ConsoleError::Released)
        ));
    }

    #[tokio::test]
    async fn test_read_code_requires_method() {
        let connector = WebConsole::new(config());
        let session = connector.open().await.unwrap();
        assert!(matches!(
            session.read_code().await,
            Err(ConsoleError::Internal(_))
        ));
    }

    #[test]
    fn test_ensure_authenticated() {
        let session = WebConsoleSession {
            config: config(),
            client: RwLock::new(None),
            csrf: RwLock::new(None),
            method: RwLock::new(None),
        };
        assert!(session.ensure_authenticated("/bots").is_ok());
        assert!(session.ensure_authenticated("/login").is_err());
    }
}
