//! The capability set the workflow needs from a browser-like session.
//!
//! [`SessionDriver`] opens sessions; [`Session`] is the narrow surface every
//! stage is built from: locate, inspect, act, press keys, read the URL, close.
//! The production implementation lives in [`crate::driver`]; tests use a
//! scripted fake.

use std::fmt;

use thiserror::Error;
use webdriver_client::ProxySettings;

/// CSS selector for one control on the remote UI.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Locator(pub String);

impl Locator {
    pub fn css(selector: impl Into<String>) -> Self {
        Self(selector.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque reference to a located element, valid for the session that made it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ElementHandle(pub String);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ElementAction {
    Click,
    /// Replace the control's value with the given text.
    Fill(String),
}

impl ElementAction {
    pub fn name(&self) -> &'static str {
        match self {
            ElementAction::Click => "click",
            ElementAction::Fill(_) => "fill",
        }
    }
}

/// How an action is delivered: as simulated user input, or by invoking the
/// element's behaviour from script when input is blocked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActMode {
    Direct,
    Programmatic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    ArrowDown,
    Enter,
}

/// Options for opening one session.
#[derive(Debug, Clone, Default)]
pub struct SessionOptions {
    pub start_url: String,
    pub proxy: Option<ProxySettings>,
    pub user_agent: Option<String>,
}

// ---------------------------------------------------------------------------
// DriverError
// ---------------------------------------------------------------------------

/// Driver failures, split into the expected UI conditions the resilience
/// layer absorbs and unexpected faults that propagate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DriverError {
    #[error("element is obstructed: {0}")]
    Obstructed(String),

    #[error("element reference is stale: {0}")]
    Stale(String),

    #[error("element is not interactable: {0}")]
    NotInteractable(String),

    #[error("driver fault: {0}")]
    Fault(String),
}

impl DriverError {
    /// True for obstruction, staleness and non-interactable controls.
    pub fn is_transient(&self) -> bool {
        !matches!(self, DriverError::Fault(_))
    }
}

pub type DriverResult<T> = std::result::Result<T, DriverError>;

// ---------------------------------------------------------------------------
// Traits
// ---------------------------------------------------------------------------

pub trait SessionDriver {
    type Session: Session;

    /// Open a session at `options.start_url`. `Ok(None)` means the remote end
    /// refused to create a session.
    fn open(&self, options: &SessionOptions) -> DriverResult<Option<Self::Session>>;
}

pub trait Session {
    fn locate(&mut self, locator: &Locator) -> DriverResult<Option<ElementHandle>>;

    /// Displayed and enabled.
    fn is_interactable(&mut self, handle: &ElementHandle) -> DriverResult<bool>;

    fn is_visible(&mut self, handle: &ElementHandle) -> DriverResult<bool>;

    fn act(&mut self, handle: &ElementHandle, action: &ElementAction, mode: ActMode)
        -> DriverResult<()>;

    fn press_keys(&mut self, handle: &ElementHandle, keys: &[Key]) -> DriverResult<()>;

    fn current_url(&mut self) -> DriverResult<String>;

    /// Release the session and its browser. Called exactly once, after which
    /// the session is dropped.
    fn close(&mut self) -> DriverResult<()>;
}
