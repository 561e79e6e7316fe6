//! レスポンスデコレーター

use bytes::Bytes;
use http::header::{HeaderValue, CONTENT_TYPE};
use http::{HeaderMap, StatusCode, Version};
use log::error;
use serde::Serialize;

use crate::common::parse_header;
use crate::dto::ErrorResponse;
use crate::error::Error;
use crate::request::context::{version_from_str, version_to_str};

/// HTTPレスポンスのデコレーター
///
/// `with_*` 系はすべて受け手を変更せず、新しいインスタンスを返す。
#[derive(Debug, Clone)]
pub struct Response {
    status: StatusCode,
    reason: Option<String>,
    version: Version,
    headers: HeaderMap,
    body: Bytes,
}

impl Default for Response {
    fn default() -> Self {
        Self::new(StatusCode::OK)
    }
}

impl Response {
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            reason: None,
            version: Version::HTTP_11,
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }

    /// 200 OK
    pub fn ok() -> Self {
        Self::new(StatusCode::OK)
    }

    /// 404 Not Found
    pub fn not_found() -> Self {
        Self::new(StatusCode::NOT_FOUND)
    }

    /// 500 Internal Server Error
    pub fn internal_server_error() -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR)
    }

    /// エラーから `ErrorResponse` 形式のJSONレスポンスを作成
    pub fn from_error(err: &Error) -> Self {
        let dto = ErrorResponse::from_error(err);
        let status = StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        match Self::new(status).with_json_body(&dto) {
            Ok(res) => res,
            Err(e) => {
                error!("Failed to encode error response: {}", e);
                Self::new(status)
                    .with_string_body(err.to_string())
                    .with_content_type("text/plain; charset=utf-8")
            }
        }
    }

    pub fn from_http(res: http::Response<Bytes>) -> Self {
        let (parts, body) = res.into_parts();
        Self {
            status: parts.status,
            reason: None,
            version: parts.version,
            headers: parts.headers,
            body,
        }
    }

    pub fn into_http(self) -> http::Response<Bytes> {
        let mut res = http::Response::new(self.body);
        *res.status_mut() = self.status;
        *res.version_mut() = self.version;
        *res.headers_mut() = self.headers;
        res
    }

    // --- アクセサ ----------------------------------------------------------

    pub fn status(&self) -> u16 {
        self.status.as_u16()
    }

    pub fn status_code(&self) -> StatusCode {
        self.status
    }

    /// 理由句（未設定なら標準の理由句）
    pub fn reason_phrase(&self) -> &str {
        match &self.reason {
            Some(reason) if !reason.is_empty() => reason.as_str(),
            _ => self.status.canonical_reason().unwrap_or("Unknown"),
        }
    }

    pub fn protocol_version(&self) -> &'static str {
        version_to_str(self.version)
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn has_header(&self, name: &str) -> bool {
        self.headers.contains_key(name)
    }

    pub fn header(&self, name: &str) -> Vec<String> {
        self.headers
            .get_all(name)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .map(str::to_string)
            .collect()
    }

    pub fn header_line(&self, name: &str) -> String {
        self.header(name).join(", ")
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    // --- コピーオンライト --------------------------------------------------

    pub fn with_status(&self, code: u16, reason: &str) -> Result<Self, Error> {
        let status = StatusCode::from_u16(code)
            .map_err(|e| Error::InvalidRequest(format!("Invalid status code {}: {}", code, e)))?;
        let mut next = self.clone();
        next.status = status;
        next.reason = if reason.is_empty() { None } else { Some(reason.to_string()) };
        Ok(next)
    }

    pub fn with_protocol_version(&self, version: &str) -> Result<Self, Error> {
        let version = version_from_str(version)
            .ok_or_else(|| Error::InvalidRequest(format!("Unsupported protocol version: {}", version)))?;
        let mut next = self.clone();
        next.version = version;
        Ok(next)
    }

    /// ヘッダーを置き換える
    pub fn with_header(&self, name: &str, value: &str) -> Result<Self, Error> {
        let (name, value) = parse_header(name, value)?;
        let mut next = self.clone();
        next.headers.insert(name, value);
        Ok(next)
    }

    /// ヘッダー値を追加する（Set-Cookie 等の複数値向け）
    pub fn with_added_header(&self, name: &str, value: &str) -> Result<Self, Error> {
        let (name, value) = parse_header(name, value)?;
        let mut next = self.clone();
        next.headers.append(name, value);
        Ok(next)
    }

    pub fn without_header(&self, name: &str) -> Self {
        let mut next = self.clone();
        next.headers.remove(name);
        next
    }

    pub fn with_body(&self, body: impl Into<Bytes>) -> Self {
        let mut next = self.clone();
        next.body = body.into();
        next
    }

    pub fn with_string_body(&self, body: impl Into<String>) -> Self {
        self.with_body(body.into())
    }

    /// JSONボディを設定し `Content-Type: application/json` を付与する
    ///
    /// エンコードに失敗した場合は `SerializationError` を返し、受け手は変わらない。
    pub fn with_json_body<T: Serialize + ?Sized>(&self, data: &T) -> Result<Self, Error> {
        let body = serde_json::to_vec(data).map_err(|e| {
            error!("Failed to encode JSON body: {}", e);
            Error::SerializationError(e.to_string())
        })?;
        Ok(self.with_body(body).with_content_type("application/json"))
    }

    /// XMLボディ（ルート要素 `response`）を設定し `Content-Type: application/xml` を付与する
    pub fn with_xml_body<T: Serialize + ?Sized>(&self, data: &T) -> Result<Self, Error> {
        let body = quick_xml::se::to_string_with_root("response", data).map_err(|e| {
            error!("Failed to encode XML body: {}", e);
            Error::SerializationError(e.to_string())
        })?;
        Ok(self.with_body(body).with_content_type("application/xml"))
    }

    fn with_content_type(mut self, value: &'static str) -> Self {
        self.headers.insert(CONTENT_TYPE, HeaderValue::from_static(value));
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    #[test]
    fn test_json_body_round_trip() {
        let data = json!({"id": 1, "url": "https://example.com/a/b", "name": "日本語", "tags": ["a", "b"]});
        let res = Response::ok().with_json_body(&data).unwrap();

        assert_eq!(res.header_line("content-type"), "application/json");
        let decoded: Value = serde_json::from_slice(res.body()).unwrap();
        assert_eq!(decoded, data);

        // スラッシュ・Unicodeはエスケープしない
        let text = std::str::from_utf8(res.body()).unwrap();
        assert!(text.contains("https://example.com/a/b"));
        assert!(text.contains("日本語"));
    }

    #[test]
    fn test_copy_on_write() {
        let original = Response::ok().with_header("X-Test", "1").unwrap();
        let changed = original
            .with_status(201, "")
            .unwrap()
            .with_header("X-Test", "2")
            .unwrap()
            .with_string_body("hello");

        assert_eq!(original.status(), 200);
        assert_eq!(original.header_line("x-test"), "1");
        assert!(original.body().is_empty());

        assert_eq!(changed.status(), 201);
        assert_eq!(changed.reason_phrase(), "Created");
        assert_eq!(changed.header_line("x-test"), "2");
        assert_eq!(&changed.body()[..], b"hello");
    }

    #[test]
    fn test_added_and_removed_headers() {
        let res = Response::ok()
            .with_added_header("Set-Cookie", "a=1")
            .unwrap()
            .with_added_header("Set-Cookie", "b=2")
            .unwrap();
        assert_eq!(res.header("set-cookie"), vec!["a=1", "b=2"]);
        assert_eq!(res.header_line("set-cookie"), "a=1, b=2");

        let removed = res.without_header("set-cookie");
        assert!(!removed.has_header("Set-Cookie"));
        assert!(res.has_header("Set-Cookie"));
    }

    #[test]
    fn test_invalid_header_is_rejected() {
        let res = Response::ok();
        assert!(matches!(res.with_header("X-Bad", "a\r\nb"), Err(Error::InvalidHeader(_))));
        assert!(matches!(res.with_header("Bad Name", "v"), Err(Error::InvalidHeader(_))));
    }

    #[test]
    fn test_custom_reason_phrase_and_version() {
        let res = Response::ok().with_status(299, "Custom").unwrap();
        assert_eq!(res.reason_phrase(), "Custom");
        let res = res.with_protocol_version("1.0").unwrap();
        assert_eq!(res.protocol_version(), "1.0");
        assert!(Response::ok().with_status(1000, "").is_err());
    }

    #[test]
    fn test_xml_body() {
        #[derive(serde::Serialize)]
        struct Item {
            id: u32,
            name: String,
        }
        let res = Response::ok()
            .with_xml_body(&Item { id: 7, name: "x".to_string() })
            .unwrap();
        assert_eq!(res.header_line("content-type"), "application/xml");
        let text = std::str::from_utf8(res.body()).unwrap();
        assert_eq!(text, "<response><id>7</id><name>x</name></response>");
    }

    #[test]
    fn test_failed_encoding_leaves_receiver_untouched() {
        let mut map = std::collections::HashMap::new();
        map.insert(vec![1u8], 1);
        let original = Response::ok().with_string_body("keep");
        let result = original.with_json_body(&map);
        assert!(matches!(result, Err(Error::SerializationError(_))));
        assert_eq!(&original.body()[..], b"keep");
        assert!(!original.has_header("content-type"));
    }

    #[test]
    fn test_http_conversion() {
        let res = Response::not_found().with_string_body("nope");
        let http_res = res.clone().into_http();
        assert_eq!(http_res.status(), StatusCode::NOT_FOUND);
        let back = Response::from_http(http_res);
        assert_eq!(back.status(), 404);
        assert_eq!(&back.body()[..], b"nope");
    }

    #[test]
    fn test_from_error_uses_mapped_status() {
        let err = Error::RouteNotFound {
            method: "GET".to_string(),
            path: "missing".to_string(),
        };
        let res = Response::from_error(&err);
        assert_eq!(res.status(), 404);
        let body: Value = serde_json::from_slice(res.body()).unwrap();
        assert_eq!(body["type"], "resource_not_found_error");
        assert_eq!(body["title"], "Route \"GET missing\" was not found");
    }
}
