//! Persisted network credentials.
//!
//! The credential file holds `ssid,password` on one line. Anything that
//! does not split into exactly two comma-separated fields is rejected.

use std::fmt;

use crate::NetworkError;

/// Network identity and secret.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    /// Network name
    pub ssid: String,
    /// Pre-shared key
    pub password: String,
}

impl Credentials {
    /// Parse credential file contents.
    pub fn parse(raw: &[u8]) -> Result<Self, NetworkError> {
        let text = std::str::from_utf8(raw).map_err(|_| NetworkError::BadCredentials)?;
        let text = text.trim_end_matches(['\r', '\n', '\0']);
        let mut fields = text.split(',');
        let (ssid, password) = match (fields.next(), fields.next(), fields.next()) {
            (Some(ssid), Some(password), None) => (ssid, password),
            _ => return Err(NetworkError::BadCredentials),
        };
        if ssid.is_empty() {
            return Err(NetworkError::BadCredentials);
        }
        Ok(Self {
            ssid: ssid.to_string(),
            password: password.to_string(),
        })
    }

    /// Render in file format.
    pub fn to_file_contents(&self) -> String {
        format!("{},{}", self.ssid, self.password)
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("ssid", &self.ssid)
            .field("password", &"<redacted>")
            .finish()
    }
}
