//! Password session gate
//!
//! When a password is configured, API calls must carry a session cookie whose
//! value is the hex SHA-256 of that password. With no password every request
//! is allowed.

use axum::http::{header, HeaderMap, HeaderValue};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

pub const COOKIE_NAME: &str = "nanphoto_sess";
pub const SESSION_MAX_AGE_SECS: u64 = 86_400;

#[derive(Debug, Clone, Default)]
pub struct SessionGate {
    password: Option<String>,
    token: Option<String>,
}

impl SessionGate {
    pub fn new(password: Option<String>) -> Self {
        let password = password.filter(|p| !p.is_empty());
        let token = password
            .as_deref()
            .map(|p| hex::encode(Sha256::digest(p.as_bytes())));
        Self { password, token }
    }

    pub fn is_enabled(&self) -> bool {
        self.token.is_some()
    }

    pub fn is_authenticated(&self, headers: &HeaderMap) -> bool {
        let Some(token) = self.token.as_deref() else {
            return true;
        };

        headers
            .get_all(header::COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(|cookies| cookies.split(';'))
            .filter_map(|pair| pair.trim().split_once('='))
            .any(|(name, value)| name == COOKIE_NAME && constant_time_eq(value.trim(), token))
    }

    pub fn check_password(&self, candidate: &str) -> bool {
        match self.password.as_deref() {
            Some(password) => constant_time_eq(candidate, password),
            None => true,
        }
    }

    /// `Set-Cookie` value granting a session. `None` when the gate is disabled.
    pub fn login_cookie(&self) -> Option<HeaderValue> {
        let token = self.token.as_deref()?;
        HeaderValue::from_str(&format!(
            "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
            COOKIE_NAME, token, SESSION_MAX_AGE_SECS
        ))
        .ok()
    }

    pub fn logout_cookie(&self) -> HeaderValue {
        HeaderValue::from_static("nanphoto_sess=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0")
    }
}

fn constant_time_eq(a: &str, b: &str) -> bool {
    a.as_bytes().ct_eq(b.as_bytes()).into()
}
