//! `webdriver-client`: blocking driver for a W3C WebDriver endpoint.
//!
//! This crate speaks the JSON wire protocol understood by `chromedriver`,
//! `geckodriver` and Selenium Grid, so the `provision` workspace can drive a
//! browser session without a scripting runtime.
//!
//! # Architecture
//!
//! ```text
//! Capabilities
//!     │
//!     ▼
//! WebDriverClient   ← POST /session, owns the reqwest blocking client
//!     │
//!     ▼
//! WebDriverSession  ← navigate, find element, click, send keys, execute
//!     │                every response decoded from the {"value": …} envelope
//!     ▼
//! WebDriverError    ← W3C error codes preserved for classification
//! ```
//!
//! # Quick start
//!
//! ```rust,ignore
//! use std::time::Duration;
//! use webdriver_client::{Capabilities, WebDriverClient};
//!
//! let client = WebDriverClient::new("http://localhost:9515", Duration::from_secs(30))?;
//! let session = client.new_session(&Capabilities::chrome().headless(true))?;
//! session.navigate("https://example.com/login")?;
//! if let Some(field) = session.find_element("input[name=email]")? {
//!     session.send_keys(&field, "user@example.com")?;
//! }
//! session.delete()?;
//! ```

pub mod client;
pub mod error;
pub mod keys;
pub mod types;


pub use client::{WebDriverClient, WebDriverSession};
pub use error::WebDriverError;
pub use types::{Browser, Capabilities, ElementRef, ProxySettings};

/// Convenience `Result` alias for this crate.
pub type Result<T> = std::result::Result<T, WebDriverError>;
