//! [`SessionDriver`] backed by a W3C WebDriver endpoint.

use serde_json::json;
use tracing::{debug, warn};
use webdriver_client::{
    keys, Browser, Capabilities, ElementRef, WebDriverClient, WebDriverError, WebDriverSession,
};

use crate::config::DriverConfig;
use crate::error::{ProvisionError, Result};
use crate::session::{
    ActMode, DriverError, DriverResult, ElementAction, ElementHandle, Key, Locator, Session,
    SessionDriver, SessionOptions,
};

const SCRIPT_CLICK: &str = "arguments[0].scrollIntoView({block: 'center'}); arguments[0].click();";

const SCRIPT_FILL: &str = "const el = arguments[0]; el.focus(); el.value = arguments[1]; \
     el.dispatchEvent(new Event('input', {bubbles: true})); \
     el.dispatchEvent(new Event('change', {bubbles: true}));";

/// Sort a WebDriver failure into the expected UI conditions and faults.
fn classify(e: WebDriverError) -> DriverError {
    let text = e.to_string();
    if e.is_click_intercepted() {
        DriverError::Obstructed(text)
    } else if e.is_stale() || e.is_no_such_element() {
        DriverError::Stale(text)
    } else if e.is_not_interactable() {
        DriverError::NotInteractable(text)
    } else {
        DriverError::Fault(text)
    }
}

fn key_char(key: Key) -> char {
    match key {
        Key::ArrowDown => keys::ARROW_DOWN,
        Key::Enter => keys::ENTER,
    }
}

// ---------------------------------------------------------------------------
// WebDriverSessionDriver
// ---------------------------------------------------------------------------

pub struct WebDriverSessionDriver {
    client: WebDriverClient,
    browser: Browser,
    headless: bool,
}

impl WebDriverSessionDriver {
    pub fn from_config(config: &DriverConfig) -> Result<Self> {
        let client = WebDriverClient::new(config.webdriver_url.clone(), config.request_timeout())
            .map_err(|e| ProvisionError::Driver(e.to_string()))?;
        Ok(Self {
            client,
            browser: config.browser,
            headless: config.headless,
        })
    }

    fn capabilities(&self, options: &SessionOptions) -> Capabilities {
        let base = match self.browser {
            Browser::Chrome => Capabilities::chrome(),
            Browser::Firefox => Capabilities::firefox(),
        };
        base.headless(self.headless)
            .user_agent(options.user_agent.clone())
            .proxy(options.proxy.clone())
    }
}

impl SessionDriver for WebDriverSessionDriver {
    type Session = BrowserSession;

    fn open(&self, options: &SessionOptions) -> DriverResult<Option<BrowserSession>> {
        let inner = match self.client.new_session(&self.capabilities(options)) {
            Ok(inner) => inner,
            Err(e) if e.code() == Some("session not created") => {
                warn!(
                    endpoint = self.client.base_url(),
                    error = %e,
                    "webdriver refused new session"
                );
                return Ok(None);
            }
            Err(e) => return Err(DriverError::Fault(e.to_string())),
        };
        debug!(session_id = inner.id(), "webdriver session opened");
        if let Err(e) = inner.navigate(&options.start_url) {
            if let Err(close_err) = inner.delete() {
                warn!(error = %close_err, "failed to delete session after navigation error");
            }
            return Err(DriverError::Fault(e.to_string()));
        }
        Ok(Some(BrowserSession { inner }))
    }
}

// ---------------------------------------------------------------------------
// BrowserSession
// ---------------------------------------------------------------------------

pub struct BrowserSession {
    inner: WebDriverSession,
}

fn element(handle: &ElementHandle) -> ElementRef {
    ElementRef(handle.0.clone())
}

impl Session for BrowserSession {
    fn locate(&mut self, locator: &Locator) -> DriverResult<Option<ElementHandle>> {
        let found = self.inner.find_element(locator.as_str()).map_err(classify)?;
        Ok(found.map(|el| ElementHandle(el.id().to_string())))
    }

    fn is_interactable(&mut self, handle: &ElementHandle) -> DriverResult<bool> {
        let el = element(handle);
        Ok(self.inner.is_displayed(&el).map_err(classify)?
            && self.inner.is_enabled(&el).map_err(classify)?)
    }

    fn is_visible(&mut self, handle: &ElementHandle) -> DriverResult<bool> {
        self.inner.is_displayed(&element(handle)).map_err(classify)
    }

    fn act(
        &mut self,
        handle: &ElementHandle,
        action: &ElementAction,
        mode: ActMode,
    ) -> DriverResult<()> {
        let el = element(handle);
        match (mode, action) {
            (ActMode::Direct, ElementAction::Click) => self.inner.click(&el),
            (ActMode::Direct, ElementAction::Fill(text)) => {
                self.inner.clear(&el).and_then(|()| self.inner.send_keys(&el, text))
            }
            (ActMode::Programmatic, ElementAction::Click) => self
                .inner
                .execute(SCRIPT_CLICK, vec![el.to_value()])
                .map(|_| ()),
            (ActMode::Programmatic, ElementAction::Fill(text)) => self
                .inner
                .execute(SCRIPT_FILL, vec![el.to_value(), json!(text)])
                .map(|_| ()),
        }
        .map_err(classify)
    }

    fn press_keys(&mut self, handle: &ElementHandle, keys: &[Key]) -> DriverResult<()> {
        let text: String = keys.iter().copied().map(key_char).collect();
        self.inner
            .send_keys(&element(handle), &text)
            .map_err(classify)
    }

    fn current_url(&mut self) -> DriverResult<String> {
        self.inner.current_url().map_err(classify)
    }

    fn close(&mut self) -> DriverResult<()> {
        self.inner.delete().map_err(classify)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};
    use serde_json::json;

    fn config(url: String) -> DriverConfig {
        DriverConfig {
            webdriver_url: url,
            login_url: "https://app.example/login".into(),
            ..DriverConfig::default()
        }
    }

    fn open(server: &mut Server) -> BrowserSession {
        server
            .mock("POST", "/session")
            .with_body(json!({"value": {"sessionId": "s1", "capabilities": {}}}).to_string())
            .create();
        server
            .mock("POST", "/session/s1/url")
            .match_body(Matcher::Json(json!({"url": "https://app.example/login"})))
            .with_body(r#"{"value": null}"#)
            .create();
        let driver = WebDriverSessionDriver::from_config(&config(server.url())).unwrap();
        let options = SessionOptions {
            start_url: "https://app.example/login".into(),
            ..SessionOptions::default()
        };
        driver.open(&options).unwrap().unwrap()
    }

    fn w3c_error(code: &str) -> String {
        json!({"value": {"error": code, "message": "boom", "stacktrace": ""}}).to_string()
    }

    #[test]
    fn open_navigates_to_start_url() {
        let mut server = Server::new();
        let session = open(&mut server);
        assert_eq!(session.inner.id(), "s1");
    }

    #[test]
    fn refused_session_is_none() {
        let mut server = Server::new();
        server
            .mock("POST", "/session")
            .with_status(500)
            .with_body(w3c_error("session not created"))
            .create();
        let driver = WebDriverSessionDriver::from_config(&config(server.url())).unwrap();
        assert!(driver.open(&SessionOptions::default()).unwrap().is_none());
    }

    #[test]
    fn intercepted_click_is_obstructed() {
        let mut server = Server::new();
        let mut session = open(&mut server);
        server
            .mock("POST", "/session/s1/element/e1/click")
            .with_status(400)
            .with_body(w3c_error("element click intercepted"))
            .create();
        let err = session
            .act(&ElementHandle("e1".into()), &ElementAction::Click, ActMode::Direct)
            .unwrap_err();
        assert!(matches!(err, DriverError::Obstructed(_)));
        assert!(err.is_transient());
    }

    #[test]
    fn programmatic_click_runs_script_with_element() {
        let mut server = Server::new();
        let mut session = open(&mut server);
        let mock = server
            .mock("POST", "/session/s1/execute/sync")
            .match_body(Matcher::PartialJson(json!({
                "args": [{"element-6066-11e4-a52e-4f735466cecf": "e1"}]
            })))
            .with_body(r#"{"value": null}"#)
            .create();
        session
            .act(&ElementHandle("e1".into()), &ElementAction::Click, ActMode::Programmatic)
            .unwrap();
        mock.assert();
    }

    #[test]
    fn interactable_requires_displayed_and_enabled() {
        let mut server = Server::new();
        let mut session = open(&mut server);
        server
            .mock("GET", "/session/s1/element/e1/displayed")
            .with_body(r#"{"value": true}"#)
            .create();
        server
            .mock("GET", "/session/s1/element/e1/enabled")
            .with_body(r#"{"value": false}"#)
            .create();
        assert!(!session.is_interactable(&ElementHandle("e1".into())).unwrap());
    }

    #[test]
    fn press_keys_sends_key_codepoints() {
        let mut server = Server::new();
        let mut session = open(&mut server);
        let mock = server
            .mock("POST", "/session/s1/element/e1/value")
            .match_body(Matcher::Json(json!({"text": "\u{E015}\u{E007}"})))
            .with_body(r#"{"value": null}"#)
            .create();
        session
            .press_keys(&ElementHandle("e1".into()), &[Key::ArrowDown, Key::Enter])
            .unwrap();
        mock.assert();
    }

    #[test]
    fn unknown_error_is_fault() {
        let mut server = Server::new();
        let mut session = open(&mut server);
        server
            .mock("GET", "/session/s1/url")
            .with_status(500)
            .with_body(w3c_error("unknown error"))
            .create();
        assert!(matches!(session.current_url(), Err(DriverError::Fault(_))));
    }
}
