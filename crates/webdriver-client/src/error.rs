use thiserror::Error;

#[derive(Debug, Error)]
pub enum WebDriverError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("WebDriver command failed ({status}) '{error}': {message}")]
    Command {
        status: u16,
        error: String,
        message: String,
    },

    #[error("Unexpected WebDriver response: {0}")]
    Protocol(String),
}

impl WebDriverError {
    /// The W3C error code (`"no such element"`, `"stale element reference"`, …)
    /// when the remote end rejected a command.
    pub fn code(&self) -> Option<&str> {
        match self {
            WebDriverError::Command { error, .. } => Some(error.as_str()),
            _ => None,
        }
    }

    pub fn is_no_such_element(&self) -> bool {
        self.code() == Some("no such element")
    }

    pub fn is_stale(&self) -> bool {
        self.code() == Some("stale element reference")
    }

    /// Another element would receive the click.
    pub fn is_click_intercepted(&self) -> bool {
        self.code() == Some("element click intercepted")
    }

    pub fn is_not_interactable(&self) -> bool {
        matches!(
            self.code(),
            Some("element not interactable") | Some("invalid element state")
        )
    }
}
