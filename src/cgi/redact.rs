//! panic時のログに載せるCGI環境の要約（機密値はマスク）

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;

const MASK: &str = "***redacted***";
const MAX_VALUE_CHARS: usize = 200;

/// キー名にこれらを含む値はマスクする
const SENSITIVE_MARKERS: &[&str] = &[
    "auth", "bearer", "cookie", "credential", "csrf", "jwt", "key", "pass", "private", "secret",
    "session", "signature", "token",
];

/// そのまま記録してよいリクエスト情報のサーバーパラメータ
const CONTEXT_KEYS: &[&str] = &[
    "QUERY_STRING",
    "CONTENT_TYPE",
    "CONTENT_LENGTH",
    "SERVER_PROTOCOL",
    "SERVER_NAME",
    "SERVER_PORT",
    "REMOTE_ADDR",
    "REMOTE_PORT",
];

/// panic発生時のリクエスト要約
///
/// `Display` で複数行のログ文字列になる。`HTTP_*` はすべて列挙し、
/// 機密らしいキーの値とクエリ中の機密パラメータはマスクする。
pub struct PanicContext<'a> {
    method: &'a str,
    uri: &'a str,
    server: &'a BTreeMap<String, String>,
}

impl<'a> PanicContext<'a> {
    pub fn new(method: &'a str, uri: &'a str, server: &'a BTreeMap<String, String>) -> Self {
        Self { method, uri, server }
    }
}

impl fmt::Display for PanicContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "CGI panic context:")?;
        writeln!(f, "  REQUEST_METHOD={}", self.method)?;
        match self.uri.split_once('?') {
            Some((path, query)) => writeln!(f, "  REQUEST_URI={}?{}", path, redact_query(query))?,
            None => writeln!(f, "  REQUEST_URI={}", self.uri)?,
        }

        for key in CONTEXT_KEYS {
            if let Some(value) = self.server.get(*key) {
                writeln!(f, "  {}={}", key, redact_value(key, value))?;
            }
        }

        write!(f, "  HTTP headers:")?;
        let mut headers = self.server.iter().filter(|(k, _)| k.starts_with("HTTP_")).peekable();
        if headers.peek().is_none() {
            return write!(f, "\n    (none)");
        }
        for (key, value) in headers {
            write!(f, "\n    {}={}", key, redact_value(key, value))?;
        }
        Ok(())
    }
}

/// キー名が機密情報らしいか（大小無視）
pub fn is_sensitive(key: &str) -> bool {
    let key = key.to_ascii_lowercase();
    SENSITIVE_MARKERS.iter().any(|marker| key.contains(marker))
}

/// ログ用に値を加工する
///
/// `QUERY_STRING` はパラメータ単位でマスクし、長すぎる値は切り詰める。
pub fn redact_value<'v>(key: &str, value: &'v str) -> Cow<'v, str> {
    if key.eq_ignore_ascii_case("QUERY_STRING") {
        return Cow::Owned(redact_query(value));
    }
    if is_sensitive(key) {
        return Cow::Borrowed(MASK);
    }
    match value.char_indices().nth(MAX_VALUE_CHARS) {
        Some((cut, _)) => Cow::Owned(format!("{}...[truncated]", &value[..cut])),
        None => Cow::Borrowed(value),
    }
}

/// クエリ文字列中の機密パラメータの値をマスクする
pub fn redact_query(query: &str) -> String {
    query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (name, value) = pair.split_once('=').unwrap_or((pair, ""));
            let value = if is_sensitive(name) { MASK } else { value };
            format!("{}={}", name, value)
        })
        .collect::<Vec<_>>()
        .join("&")
}
