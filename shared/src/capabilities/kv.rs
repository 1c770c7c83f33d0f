use serde::{Deserialize, Serialize};
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use tracing::debug;

use crate::event::Event;
use crate::{AppError, ErrorKind, TOKEN_STORAGE_KEY};

use super::AppKv;

pub const MAX_TOKEN_LENGTH: usize = 8 * 1024;

#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq, Eq)]
pub enum KvError {
    #[error("storage unavailable: {message}")]
    Storage { message: String },

    #[error("stored token is unusable: {reason}")]
    InvalidToken { reason: String },
}

impl From<KvError> for AppError {
    fn from(err: KvError) -> Self {
        match &err {
            KvError::Storage { .. } => AppError::new(ErrorKind::Storage, err.to_string()),
            KvError::InvalidToken { .. } => {
                AppError::new(ErrorKind::Authentication, "Please sign in again.")
                    .with_internal(err.to_string())
            }
        }
    }
}

pub type KvResult<T> = Result<T, KvError>;

/// Interpret stored bytes as a bearer token. Empty values count as signed out.
pub fn decode_token(stored: Option<Vec<u8>>) -> KvResult<Option<String>> {
    let Some(bytes) = stored else {
        return Ok(None);
    };

    if bytes.len() > MAX_TOKEN_LENGTH {
        return Err(KvError::InvalidToken {
            reason: format!("{} bytes exceeds maximum of {MAX_TOKEN_LENGTH}", bytes.len()),
        });
    }

    let token = String::from_utf8(bytes).map_err(|_| KvError::InvalidToken {
        reason: "not valid UTF-8".to_string(),
    })?;

    let token = token.trim();
    if token.is_empty() {
        return Ok(None);
    }
    Ok(Some(token.to_string()))
}

/// Durable home of the session token under [`TOKEN_STORAGE_KEY`].
pub struct TokenStore<'a> {
    kv: &'a AppKv,
}

impl<'a> TokenStore<'a> {
    pub fn new(kv: &'a AppKv) -> Self {
        Self { kv }
    }

    pub fn load<F>(&self, make_event: F)
    where
        F: FnOnce(KvResult<Option<String>>) -> Event + Send + Sync + 'static,
    {
        debug!(key = TOKEN_STORAGE_KEY, "reading session token");
        self.kv.get(TOKEN_STORAGE_KEY.to_string(), move |result| {
            make_event(
                result
                    .map_err(|e| KvError::Storage {
                        message: e.to_string(),
                    })
                    .and_then(|bytes| decode_token(Some(bytes))),
            )
        });
    }

    pub fn save<F>(&self, token: &SecretString, make_event: F)
    where
        F: FnOnce(KvResult<()>) -> Event + Send + Sync + 'static,
    {
        debug!(key = TOKEN_STORAGE_KEY, "persisting session token");
        let value = token.expose_secret().as_bytes().to_vec();
        self.kv.set(TOKEN_STORAGE_KEY.to_string(), value, move |result| {
            make_event(result.map(|_| ()).map_err(|e| KvError::Storage {
                message: e.to_string(),
            }))
        });
    }

    pub fn clear<F>(&self, make_event: F)
    where
        F: Fn(KvResult<()>) -> Event + Send + Sync + 'static,
    {
        debug!(key = TOKEN_STORAGE_KEY, "removing session token");
        self.kv.delete(TOKEN_STORAGE_KEY.to_string(), move |result| {
            make_event(result.map(|_| ()).map_err(|e| KvError::Storage {
                message: e.to_string(),
            }))
        });
    }
}
