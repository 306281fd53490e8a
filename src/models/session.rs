//! Transport credentials produced by a session bootstrap.

use chrono::{DateTime, Utc};

/// Cookies and headers that make feed requests look like a warmed-up browser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub cookies: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub acquired_at: DateTime<Utc>,
    /// Earliest cookie expiry, if any cookie carried one
    pub expires_at: Option<DateTime<Utc>>,
}

impl Session {
    pub fn new(cookies: Vec<(String, String)>, headers: Vec<(String, String)>) -> Self {
        Self {
            cookies,
            headers,
            acquired_at: Utc::now(),
            expires_at: None,
        }
    }

    pub fn with_expiry(mut self, expires_at: Option<DateTime<Utc>>) -> Self {
        self.expires_at = expires_at;
        self
    }

    /// Value for the `Cookie` header, `None` when there are no cookies.
    pub fn cookie_header(&self) -> Option<String> {
        if self.cookies.is_empty() {
            return None;
        }
        Some(
            self.cookies
                .iter()
                .map(|(name, value)| format!("{name}={value}"))
                .collect::<Vec<_>>()
                .join("; "),
        )
    }

    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_none_or(|expiry| now < expiry)
    }

    pub fn is_valid(&self) -> bool {
        self.is_valid_at(Utc::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn cookie_header_joins_pairs() {
        let session = Session::new(
            vec![
                ("__cf_bm".to_string(), "abc".to_string()),
                ("dcsrd".to_string(), "xyz".to_string()),
            ],
            Vec::new(),
        );
        assert_eq!(
            session.cookie_header().as_deref(),
            Some("__cf_bm=abc; dcsrd=xyz")
        );
        assert!(Session::new(Vec::new(), Vec::new()).cookie_header().is_none());
    }

    #[test]
    fn expiry_bounds_validity() {
        let now = Utc::now();
        let session = Session::new(Vec::new(), Vec::new()).with_expiry(Some(now));
        assert!(session.is_valid_at(now - Duration::seconds(1)));
        assert!(!session.is_valid_at(now));

        let open_ended = Session::new(Vec::new(), Vec::new());
        assert!(open_ended.is_valid_at(now + Duration::days(365)));
    }
}
