use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::Method;
use serde_json::{json, Value};
use tracing::debug;

use crate::types::{Capabilities, ElementRef, ErrorValue, NewSessionValue};
use crate::{Result, WebDriverError};

// ─── WebDriverClient ──────────────────────────────────────────────────────

/// Connection to a WebDriver remote end (`chromedriver`, `geckodriver`, Grid).
#[derive(Debug, Clone)]
pub struct WebDriverClient {
    http: Client,
    base_url: String,
}

impl WebDriverClient {
    /// Build a client for `base_url` with a per-request `timeout`.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Start a new browser session.
    pub fn new_session(&self, caps: &Capabilities) -> Result<WebDriverSession> {
        let value = self.send(Method::POST, "/session", Some(caps.to_json()))?;
        let created: NewSessionValue = serde_json::from_value(value)
            .map_err(|e| WebDriverError::Protocol(format!("new session: {e}")))?;
        debug!(
            session_id = %created.session_id,
            browser = caps.browser.name(),
            "webdriver session created"
        );
        Ok(WebDriverSession {
            client: self.clone(),
            id: created.session_id,
        })
    }

    /// Issue one command and unwrap the `{"value": …}` envelope.
    ///
    /// Non-2xx responses are decoded into [`WebDriverError::Command`] so the
    /// caller can classify the W3C error code.
    pub(crate) fn send(&self, method: Method, path: &str, body: Option<Value>) -> Result<Value> {
        let url = format!("{}{}", self.base_url, path);
        let mut req = self.http.request(method, &url);
        if let Some(body) = body {
            req = req.json(&body);
        }
        let response = req.send()?;
        let status = response.status();
        let text = response.text()?;

        let envelope: Value = serde_json::from_str(&text).map_err(|e| {
            let hint: String = text.chars().take(200).collect();
            WebDriverError::Protocol(format!("{e} (body: {hint})"))
        })?;
        let value = envelope.get("value").cloned().unwrap_or(Value::Null);

        if !status.is_success() {
            let err: ErrorValue = serde_json::from_value(value).map_err(|e| {
                WebDriverError::Protocol(format!("error response without error code: {e}"))
            })?;
            return Err(WebDriverError::Command {
                status: status.as_u16(),
                error: err.error,
                message: err.message,
            });
        }
        Ok(value)
    }
}

// ─── WebDriverSession ─────────────────────────────────────────────────────

/// One live browser session. Dropping it does not end the remote session;
/// call [`WebDriverSession::delete`].
#[derive(Debug)]
pub struct WebDriverSession {
    client: WebDriverClient,
    id: String,
}

impl WebDriverSession {
    pub fn id(&self) -> &str {
        &self.id
    }

    fn path(&self, suffix: &str) -> String {
        format!("/session/{}{}", self.id, suffix)
    }

    fn element_path(&self, element: &ElementRef, suffix: &str) -> String {
        self.path(&format!("/element/{}{}", element.id(), suffix))
    }

    pub fn navigate(&self, url: &str) -> Result<()> {
        self.client
            .send(Method::POST, &self.path("/url"), Some(json!({ "url": url })))?;
        Ok(())
    }

    pub fn current_url(&self) -> Result<String> {
        let value = self.client.send(Method::GET, &self.path("/url"), None)?;
        value
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| {
                WebDriverError::Protocol(format!("current url was not a string: {value}"))
            })
    }

    /// Find the first element matching a CSS selector.
    ///
    /// Returns `Ok(None)` for `no such element`; every other failure is an error.
    pub fn find_element(&self, css: &str) -> Result<Option<ElementRef>> {
        let body = json!({ "using": "css selector", "value": css });
        match self.client.send(Method::POST, &self.path("/element"), Some(body)) {
            Ok(value) => ElementRef::from_value(&value).map(Some).ok_or_else(|| {
                WebDriverError::Protocol(format!("malformed element reference: {value}"))
            }),
            Err(e) if e.is_no_such_element() => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub fn is_displayed(&self, element: &ElementRef) -> Result<bool> {
        let value = self
            .client
            .send(Method::GET, &self.element_path(element, "/displayed"), None)?;
        Ok(value.as_bool().unwrap_or(false))
    }

    pub fn is_enabled(&self, element: &ElementRef) -> Result<bool> {
        let value = self
            .client
            .send(Method::GET, &self.element_path(element, "/enabled"), None)?;
        Ok(value.as_bool().unwrap_or(false))
    }

    pub fn click(&self, element: &ElementRef) -> Result<()> {
        self.client
            .send(Method::POST, &self.element_path(element, "/click"), Some(json!({})))?;
        Ok(())
    }

    pub fn clear(&self, element: &ElementRef) -> Result<()> {
        self.client
            .send(Method::POST, &self.element_path(element, "/clear"), Some(json!({})))?;
        Ok(())
    }

    /// Type `text` into the element. Special keys from [`crate::keys`] may be
    /// embedded in the string.
    pub fn send_keys(&self, element: &ElementRef, text: &str) -> Result<()> {
        self.client.send(
            Method::POST,
            &self.element_path(element, "/value"),
            Some(json!({ "text": text })),
        )?;
        Ok(())
    }

    /// Run a synchronous script in the page and return its result.
    pub fn execute(&self, script: &str, args: Vec<Value>) -> Result<Value> {
        self.client.send(
            Method::POST,
            &self.path("/execute/sync"),
            Some(json!({ "script": script, "args": args })),
        )
    }

    /// End the session and close the browser.
    pub fn delete(&self) -> Result<()> {
        self.client.send(Method::DELETE, &self.path(""), None)?;
        debug!(session_id = %self.id, "webdriver session deleted");
        Ok(())
    }
}
