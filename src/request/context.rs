//! リクエスト構築の入力となるサーバーコンテキスト

use std::collections::BTreeMap;

use bytes::Bytes;

use crate::common::{
    header_name_to_server_key, parse_cookie_header, parse_query_string, ParameterBucket,
};

/// スーパーグローバル相当の明示的なリクエストコンテキスト
#[derive(Debug, Clone, Default)]
pub struct ServerContext {
    pub method: String,
    pub uri: String,
    pub protocol_version: String,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
    pub server: BTreeMap<String, String>,
    pub query: ParameterBucket,
    pub post: ParameterBucket,
    pub cookies: ParameterBucket,
}

impl ServerContext {
    /// メソッドとURIから作成（クエリはURIから解析）
    pub fn new(method: impl Into<String>, uri: impl Into<String>) -> Self {
        let uri = uri.into();
        let query = uri
            .split_once('?')
            .map(|(_, q)| q.split('#').next().unwrap_or(""))
            .map(parse_query_string)
            .unwrap_or_default();
        Self {
            method: method.into(),
            uri,
            protocol_version: "1.1".to_string(),
            query,
            ..Default::default()
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    pub fn with_server_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.server.insert(name.into(), value.into());
        self
    }

    pub fn with_query(mut self, query: ParameterBucket) -> Self {
        self.query = query;
        self
    }

    pub fn with_post(mut self, post: ParameterBucket) -> Self {
        self.post = post;
        self
    }

    pub fn with_cookies(mut self, cookies: ParameterBucket) -> Self {
        self.cookies = cookies;
        self
    }

    pub fn with_protocol_version(mut self, version: impl Into<String>) -> Self {
        self.protocol_version = version.into();
        self
    }

    /// 最初に一致したヘッダー値（名前は大小無視）
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// `http::Request` から構築する
    ///
    /// サーバーパラメータ（`REQUEST_METHOD`・`HTTP_*` 等）、Cookie、
    /// フォーム形式のPOSTボディも導出する。
    pub fn from_http(req: http::Request<Bytes>) -> Self {
        let (parts, body) = req.into_parts();
        let uri = parts.uri.to_string();
        let protocol = version_to_str(parts.version).to_string();

        let mut ctx = Self::new(parts.method.as_str(), uri.clone()).with_protocol_version(protocol.clone());
        ctx.server.insert("REQUEST_METHOD".to_string(), parts.method.as_str().to_string());
        ctx.server.insert(
            "REQUEST_URI".to_string(),
            parts.uri.path_and_query().map(|pq| pq.as_str().to_string()).unwrap_or(uri),
        );
        ctx.server.insert("QUERY_STRING".to_string(), parts.uri.query().unwrap_or("").to_string());
        ctx.server.insert("SERVER_PROTOCOL".to_string(), format!("HTTP/{}", protocol));

        for (name, value) in parts.headers.iter() {
            let Ok(value) = value.to_str() else {
                continue;
            };
            ctx.headers.push((name.as_str().to_string(), value.to_string()));
            let key = header_name_to_server_key(name.as_str());
            ctx.server
                .entry(key)
                .and_modify(|v| {
                    v.push_str(", ");
                    v.push_str(value);
                })
                .or_insert_with(|| value.to_string());
        }

        ctx.body = body;
        ctx.with_derived_params()
    }

    /// `Cookie` ヘッダーとフォーム形式のPOSTボディからパラメータを導出する
    pub fn with_derived_params(mut self) -> Self {
        if let Some(cookies) = self.header("cookie").map(parse_cookie_header) {
            self.cookies = cookies;
        }

        let is_form = self
            .header("content-type")
            .and_then(|ct| ct.split(';').next())
            .map(|m| m.trim().eq_ignore_ascii_case("application/x-www-form-urlencoded"))
            .unwrap_or(false);
        if is_form && self.method.trim().eq_ignore_ascii_case("POST") {
            self.post = parse_query_string(&String::from_utf8_lossy(&self.body));
        }
        self
    }
}

pub(crate) fn version_to_str(version: http::Version) -> &'static str {
    match version {
        http::Version::HTTP_09 => "0.9",
        http::Version::HTTP_10 => "1.0",
        http::Version::HTTP_2 => "2",
        http::Version::HTTP_3 => "3",
        _ => "1.1",
    }
}

pub(crate) fn version_from_str(version: &str) -> Option<http::Version> {
    match version.trim().trim_start_matches("HTTP/") {
        "0.9" => Some(http::Version::HTTP_09),
        "1.0" => Some(http::Version::HTTP_10),
        "1.1" => Some(http::Version::HTTP_11),
        "2" | "2.0" => Some(http::Version::HTTP_2),
        "3" | "3.0" => Some(http::Version::HTTP_3),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_new_parses_query() {
        let ctx = ServerContext::new("GET", "/index.php?p[]=test&p[]=post#top");
        assert_eq!(ctx.query.get("p"), Some(&json!(["test", "post"])));
        assert_eq!(ctx.protocol_version, "1.1");
    }

    #[test]
    fn test_from_http_derives_server_params() {
        let req = http::Request::builder()
            .method("POST")
            .uri("/submit?x=1")
            .header("Content-Type", "application/x-www-form-urlencoded")
            .header("X-Forwarded-For", "10.0.0.1")
            .header("Cookie", "sid=abc")
            .body(Bytes::from_static(b"name=Taro&age=20"))
            .unwrap();
        let ctx = ServerContext::from_http(req);

        assert_eq!(ctx.method, "POST");
        assert_eq!(ctx.server.get("REQUEST_METHOD").map(String::as_str), Some("POST"));
        assert_eq!(ctx.server.get("REQUEST_URI").map(String::as_str), Some("/submit?x=1"));
        assert_eq!(ctx.server.get("QUERY_STRING").map(String::as_str), Some("x=1"));
        assert_eq!(ctx.server.get("HTTP_X_FORWARDED_FOR").map(String::as_str), Some("10.0.0.1"));
        assert_eq!(ctx.server.get("SERVER_PROTOCOL").map(String::as_str), Some("HTTP/1.1"));
        assert_eq!(ctx.query.get("x"), Some(&json!("1")));
        assert_eq!(ctx.cookies.get("sid"), Some(&json!("abc")));
        assert_eq!(ctx.post.get("name"), Some(&json!("Taro")));
        assert_eq!(&ctx.body[..], b"name=Taro&age=20");
    }

    #[test]
    fn test_from_http_json_body_is_not_form() {
        let req = http::Request::builder()
            .method("POST")
            .uri("/submit")
            .header("Content-Type", "application/json")
            .body(Bytes::from_static(b"{\"a\":1}"))
            .unwrap();
        let ctx = ServerContext::from_http(req);
        assert!(ctx.post.is_empty());
        assert_eq!(ctx.header("content-type"), Some("application/json"));
    }

    #[test]
    fn test_version_conversion() {
        assert_eq!(version_from_str("HTTP/1.0"), Some(http::Version::HTTP_10));
        assert_eq!(version_from_str("2"), Some(http::Version::HTTP_2));
        assert_eq!(version_from_str("9.9"), None);
        assert_eq!(version_to_str(http::Version::HTTP_11), "1.1");
    }
}
