//! Access log formats
//!
//! - `combined`: Apache/Nginx combined
//! - `common`: Common Log Format
//! - `json`: one object per line
//! - anything else: a pattern with `$variables`

use chrono::{DateTime, Local};
use regex::{Captures, Regex};
use serde::Serialize;
use std::sync::LazyLock;

const CLF_TIME: &str = "%d/%b/%Y:%H:%M:%S %z";

static VARIABLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$([a-z_0-9]+)").expect("variable pattern is valid"));

/// One served request.
#[derive(Debug, Clone, Serialize)]
pub struct AccessLogEntry {
    pub remote_addr: String,
    #[serde(serialize_with = "rfc3339")]
    pub time: DateTime<Local>,
    pub method: String,
    pub path: String,
    /// Query string without the leading `?`.
    pub query: Option<String>,
    pub http_version: String,
    pub status: u16,
    pub body_bytes: usize,
    pub referer: Option<String>,
    pub user_agent: Option<String>,
    /// Route file that handled the request.
    pub file: Option<String>,
    pub request_time_us: u64,
}

fn rfc3339<S: serde::Serializer>(time: &DateTime<Local>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&time.to_rfc3339())
}

impl AccessLogEntry {
    pub fn new(remote_addr: impl Into<String>, method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            remote_addr: remote_addr.into(),
            time: Local::now(),
            method: method.into(),
            path: path.into(),
            query: None,
            http_version: "1.1".to_string(),
            status: 200,
            body_bytes: 0,
            referer: None,
            user_agent: None,
            file: None,
            request_time_us: 0,
        }
    }

    pub fn format(&self, format: &str) -> String {
        match format {
            "combined" => format!(
                "{} \"{}\" \"{}\"",
                self.common(),
                self.referer.as_deref().unwrap_or("-"),
                self.user_agent.as_deref().unwrap_or("-"),
            ),
            "common" => self.common(),
            "json" => serde_json::to_string(self).unwrap_or_default(),
            pattern => self.custom(pattern),
        }
    }

    fn request_uri(&self) -> String {
        match &self.query {
            Some(q) => format!("{}?{q}", self.path),
            None => self.path.clone(),
        }
    }

    fn request_line(&self) -> String {
        format!("{} {} HTTP/{}", self.method, self.request_uri(), self.http_version)
    }

    fn common(&self) -> String {
        format!(
            "{} - - [{}] \"{}\" {} {}",
            self.remote_addr,
            self.time.format(CLF_TIME),
            self.request_line(),
            self.status,
            self.body_bytes,
        )
    }

    /// Variables: `$remote_addr`, `$time_local`, `$time_iso8601`, `$request`,
    /// `$request_method`, `$request_uri`, `$request_time`, `$status`,
    /// `$body_bytes_sent`, `$http_referer`, `$http_user_agent`, `$file`.
    ///
    /// The pattern is scanned once, so `$` text inside substituted values is
    /// written as-is. Unknown variables are left untouched.
    fn custom(&self, pattern: &str) -> String {
        VARIABLE_RE
            .replace_all(pattern, |caps: &Captures| {
                self.variable(&caps[1]).unwrap_or_else(|| caps[0].to_string())
            })
            .into_owned()
    }

    fn variable(&self, name: &str) -> Option<String> {
        let or_dash = |value: &Option<String>| value.clone().unwrap_or_else(|| "-".into());
        let value = match name {
            "remote_addr" => self.remote_addr.clone(),
            "time_local" => self.time.format(CLF_TIME).to_string(),
            "time_iso8601" => self.time.to_rfc3339(),
            "request" => self.request_line(),
            "request_method" => self.method.clone(),
            "request_uri" => self.request_uri(),
            "request_time" => {
                #[allow(clippy::cast_precision_loss)]
                let seconds = self.request_time_us as f64 / 1_000_000.0;
                format!("{seconds:.3}")
            }
            "status" => self.status.to_string(),
            "body_bytes_sent" => self.body_bytes.to_string(),
            "http_referer" => or_dash(&self.referer),
            "http_user_agent" => or_dash(&self.user_agent),
            "file" => or_dash(&self.file),
            _ => return None,
        };
        Some(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry() -> AccessLogEntry {
        let mut entry = AccessLogEntry::new("10.0.0.7", "GET", "/blog/hello");
        entry.query = Some("ref=home".to_string());
        entry.status = 404;
        entry.body_bytes = 512;
        entry.referer = Some("https://example.com/".to_string());
        entry.user_agent = Some("curl/8.0".to_string());
        entry.file = Some("routes/404.ejs".to_string());
        entry.request_time_us = 2600;
        entry
    }

    #[test]
    fn test_combined() {
        let line = entry().format("combined");
        assert!(line.starts_with("10.0.0.7 - - ["));
        assert!(line.contains("\"GET /blog/hello?ref=home HTTP/1.1\" 404 512"));
        assert!(line.ends_with("\"https://example.com/\" \"curl/8.0\""));
    }

    #[test]
    fn test_common_has_no_agent() {
        let line = entry().format("common");
        assert!(line.ends_with("404 512"));
        assert!(!line.contains("curl"));
    }

    #[test]
    fn test_json() {
        let value: serde_json::Value = serde_json::from_str(&entry().format("json")).unwrap();
        assert_eq!(value["status"], 404);
        assert_eq!(value["file"], "routes/404.ejs");
        assert_eq!(value["query"], "ref=home");
        assert!(value["time"].as_str().is_some());
    }

    #[test]
    fn test_custom_pattern() {
        let line = entry().format("$request_method $request_uri -> $file in $request_time");
        assert_eq!(line, "GET /blog/hello?ref=home -> routes/404.ejs in 0.003");
    }

    #[test]
    fn test_custom_missing_values() {
        let line = AccessLogEntry::new("1.2.3.4", "GET", "/").format("$http_referer|$file");
        assert_eq!(line, "-|-");
    }

    #[test]
    fn test_custom_values_are_not_expanded_again() {
        let mut entry = AccessLogEntry::new("1.2.3.4", "GET", "/x$status$remote_addr");
        entry.status = 404;
        assert_eq!(entry.format("$request_uri"), "/x$status$remote_addr");
        assert_eq!(entry.format("$status $unknown"), "404 $unknown");
    }
}
