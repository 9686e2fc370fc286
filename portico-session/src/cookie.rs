//! Cookie-based identity transport.

use crate::manager::IdentityTransport;
use http::header::{COOKIE, SET_COOKIE};
use http::{HeaderMap, HeaderValue};

/// SameSite cookie attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SameSite {
    /// Strict same-site enforcement
    Strict,
    /// Lax same-site enforcement (default)
    Lax,
    /// No same-site enforcement
    None,
}

impl SameSite {
    /// Attribute value as it appears in the Set-Cookie header.
    pub fn as_str(&self) -> &'static str {
        match self {
            SameSite::Strict => "Strict",
            SameSite::Lax => "Lax",
            SameSite::None => "None",
        }
    }
}

/// Cookie configuration for [`CookieTransport`].
#[derive(Debug, Clone)]
pub struct CookieConfig {
    /// Cookie name
    pub name: String,
    /// Cookie path
    pub path: String,
    /// Cookie domain
    pub domain: Option<String>,
    /// Send only over HTTPS
    pub secure: bool,
    /// Hide from client-side scripts
    pub http_only: bool,
    /// SameSite attribute
    pub same_site: SameSite,
}

impl Default for CookieConfig {
    fn default() -> Self {
        Self {
            name: "sessid".to_string(),
            path: "/".to_string(),
            domain: None,
            secure: false,
            http_only: true,
            same_site: SameSite::Lax,
        }
    }
}

impl CookieConfig {
    /// Set the cookie name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the cookie path.
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    /// Set the cookie domain.
    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    /// Restrict the cookie to HTTPS.
    pub fn with_secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    /// Set the HttpOnly attribute.
    pub fn with_http_only(mut self, http_only: bool) -> Self {
        self.http_only = http_only;
        self
    }

    /// Set the SameSite attribute.
    pub fn with_same_site(mut self, same_site: SameSite) -> Self {
        self.same_site = same_site;
        self
    }
}

/// Identity transport that carries the session id in a cookie.
pub struct CookieTransport {
    config: CookieConfig,
}

impl CookieTransport {
    /// Create a transport with the default cookie configuration.
    pub fn new() -> Self {
        Self::with_config(CookieConfig::default())
    }

    /// Create a transport with an explicit cookie configuration.
    pub fn with_config(config: CookieConfig) -> Self {
        Self { config }
    }

    fn build_cookie(&self, id: &str, expire: bool) -> String {
        let mut cookie = format!("{}={}; Path={}", self.config.name, id, self.config.path);

        if let Some(ref domain) = self.config.domain {
            cookie.push_str(&format!("; Domain={}", domain));
        }

        if expire {
            cookie.push_str("; Max-Age=0");
        }

        if self.config.secure {
            cookie.push_str("; Secure");
        }

        if self.config.http_only {
            cookie.push_str("; HttpOnly");
        }

        cookie.push_str(&format!("; SameSite={}", self.config.same_site.as_str()));

        cookie
    }
}

impl Default for CookieTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl IdentityTransport for CookieTransport {
    fn extract(&self, headers: &HeaderMap) -> Option<String> {
        for value in headers.get_all(COOKIE) {
            let Ok(raw) = value.to_str() else { continue };
            for pair in raw.split(';') {
                let mut parts = pair.trim().splitn(2, '=');
                let name = parts.next().unwrap_or_default().trim();
                if name != self.config.name {
                    continue;
                }
                if let Some(id) = parts.next() {
                    let id = id.trim();
                    if !id.is_empty() {
                        return Some(id.to_string());
                    }
                }
            }
        }
        None
    }

    fn record(&self, id: &str, headers: &mut HeaderMap) {
        if let Ok(value) = HeaderValue::from_str(&self.build_cookie(id, false)) {
            headers.append(SET_COOKIE, value);
        }
    }

    fn clear(&self, headers: &mut HeaderMap) {
        if let Ok(value) = HeaderValue::from_str(&self.build_cookie("", true)) {
            headers.append(SET_COOKIE, value);
        }
    }
}
