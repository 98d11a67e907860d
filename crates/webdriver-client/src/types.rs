use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Key under which W3C remote ends return element references.
pub const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";

// ─── Browser ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Browser {
    #[default]
    Chrome,
    Firefox,
}

impl Browser {
    pub fn name(&self) -> &'static str {
        match self {
            Browser::Chrome => "chrome",
            Browser::Firefox => "firefox",
        }
    }
}

// ─── ProxySettings ────────────────────────────────────────────────────────

/// Manual proxy applied to every scheme the browser supports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxySettings {
    /// `host:port` of the proxy server.
    pub address: String,
    #[serde(default)]
    pub no_proxy: Vec<String>,
}

// ─── Capabilities ─────────────────────────────────────────────────────────

/// Requested capabilities for `POST /session`.
///
/// Only the subset needed to launch a configured browser is modelled; the
/// vendor-specific option blocks are built in [`Capabilities::to_json`].
#[derive(Debug, Clone, Default)]
pub struct Capabilities {
    pub browser: Browser,
    pub headless: bool,
    pub user_agent: Option<String>,
    pub proxy: Option<ProxySettings>,
    /// Extra command-line arguments passed straight to the browser.
    pub args: Vec<String>,
}

impl Capabilities {
    pub fn chrome() -> Self {
        Self {
            browser: Browser::Chrome,
            ..Default::default()
        }
    }

    pub fn firefox() -> Self {
        Self {
            browser: Browser::Firefox,
            ..Default::default()
        }
    }

    pub fn headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    pub fn user_agent(mut self, user_agent: Option<String>) -> Self {
        self.user_agent = user_agent;
        self
    }

    pub fn proxy(mut self, proxy: Option<ProxySettings>) -> Self {
        self.proxy = proxy;
        self
    }

    /// Render the `{"capabilities": {"alwaysMatch": …}}` request body.
    pub fn to_json(&self) -> Value {
        let mut always = serde_json::Map::new();
        always.insert("browserName".into(), json!(self.browser.name()));

        if let Some(proxy) = &self.proxy {
            always.insert(
                "proxy".into(),
                json!({
                    "proxyType": "manual",
                    "httpProxy": proxy.address,
                    "sslProxy": proxy.address,
                    "noProxy": proxy.no_proxy,
                }),
            );
        }

        match self.browser {
            Browser::Chrome => {
                let mut args = self.args.clone();
                if self.headless {
                    args.push("--headless=new".into());
                }
                if let Some(ua) = &self.user_agent {
                    args.push(format!("--user-agent={ua}"));
                }
                always.insert("goog:chromeOptions".into(), json!({ "args": args }));
            }
            Browser::Firefox => {
                let mut args = self.args.clone();
                if self.headless {
                    args.push("-headless".into());
                }
                let mut prefs = serde_json::Map::new();
                if let Some(ua) = &self.user_agent {
                    prefs.insert("general.useragent.override".into(), json!(ua));
                }
                always.insert(
                    "moz:firefoxOptions".into(),
                    json!({ "args": args, "prefs": prefs }),
                );
            }
        }

        json!({ "capabilities": { "alwaysMatch": always } })
    }
}

// ─── ElementRef ───────────────────────────────────────────────────────────

/// Opaque web element reference handed out by the remote end.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ElementRef(pub String);

impl ElementRef {
    /// Decode `{"element-6066-…": "<id>"}`.
    pub fn from_value(value: &Value) -> Option<Self> {
        value
            .get(ELEMENT_KEY)
            .and_then(Value::as_str)
            .map(|id| ElementRef(id.to_string()))
    }

    /// Encode as a script argument for `execute/sync`.
    pub fn to_value(&self) -> Value {
        json!({ ELEMENT_KEY: self.0 })
    }

    pub fn id(&self) -> &str {
        &self.0
    }
}

// ─── Wire envelopes ───────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub(crate) struct ErrorValue {
    pub error: String,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct NewSessionValue {
    pub session_id: String,
}
