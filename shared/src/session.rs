use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

/// Whether the durable token has been read yet.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SessionState {
    #[default]
    Unknown,
    SignedOut,
    SignedIn,
}

/// The in-memory session. The token itself never leaves this struct except
/// as a bearer header value or when persisting it.
#[derive(Debug, Default)]
pub struct Session {
    token: Option<SecretString>,
    state: SessionState,
}

impl Session {
    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    pub fn is_resolved(&self) -> bool {
        self.state != SessionState::Unknown
    }

    pub fn sign_in(&mut self, token: String) {
        self.token = Some(SecretString::new(token));
        self.state = SessionState::SignedIn;
    }

    pub fn sign_out(&mut self) {
        self.token = None;
        self.state = SessionState::SignedOut;
    }

    /// Apply a fresh read from durable storage. Returns true when the
    /// authenticated signal flipped.
    pub fn restore(&mut self, token: Option<String>) -> bool {
        let was = self.is_authenticated();
        match token {
            Some(token) => self.sign_in(token),
            None => self.sign_out(),
        }
        was != self.is_authenticated()
    }

    pub fn token(&self) -> Option<&SecretString> {
        self.token.as_ref()
    }

    pub fn bearer(&self) -> Option<String> {
        self.token
            .as_ref()
            .map(|t| format!("Bearer {}", t.expose_secret()))
    }
}
