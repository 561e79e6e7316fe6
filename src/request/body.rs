//! JSONボディの取り込み

use log::{debug, warn};
use serde_json::Value;

use crate::common::{BodyStream, Method, ParamBuckets, ParameterBucket};
use crate::error::Error;

/// Content-Type が JSON か（`;` 以前を trim・大小無視で比較）
pub fn is_json_content_type(content_type: &str) -> bool {
    content_type
        .split(';')
        .next()
        .map(|mime| mime.trim().eq_ignore_ascii_case("application/json"))
        .unwrap_or(false)
}

/// JSONボディをデコードし、メソッドに応じたバケットへマージする
#[derive(Debug, Clone, Copy, Default)]
pub struct BodyIngestor;

impl BodyIngestor {
    /// ボディをデコードする
    ///
    /// JSON以外のContent-TypeはNone。
    /// 空（空白のみ）のボディ、不正なJSON、トップレベルがオブジェクトでない場合は `MalformedBody`。
    pub fn decode(content_type: &str, raw: &[u8]) -> Result<Option<ParameterBucket>, Error> {
        if !is_json_content_type(content_type) {
            return Ok(None);
        }
        if raw.iter().all(|b| b.is_ascii_whitespace()) {
            warn!("Empty body with a JSON content type");
            return Err(Error::MalformedBody("Invalid JSON: empty body".to_string()));
        }

        let value: Value = serde_json::from_slice(raw).map_err(|e| {
            warn!("Failed to decode JSON body: {}", e);
            Error::MalformedBody(format!("Invalid JSON: {}", e))
        })?;

        match ParameterBucket::from_value(&value) {
            Some(bucket) => Ok(Some(bucket)),
            None => Err(Error::MalformedBody(
                "JSON body must be an object at the top level".to_string(),
            )),
        }
    }

    /// デコード済みの値をメソッドに応じたバケットへマージする
    ///
    /// - POST: post + request
    /// - PUT / PATCH / UPDATE: put + request
    /// - GET: query + request
    /// - その他: 何もしない
    ///
    /// キーが衝突した場合はデコード済みの値が勝つ。
    pub fn merge(method: Method, decoded: &ParameterBucket, buckets: &mut ParamBuckets) {
        let target = match method {
            Method::POST => &mut buckets.post,
            Method::PUT | Method::PATCH | Method::UPDATE => &mut buckets.put,
            Method::GET => &mut buckets.query,
            _ => {
                debug!("JSON body ignored for method {}", method);
                return;
            }
        };
        target.merge(decoded);
        buckets.request.merge(decoded);
    }

    /// デコードとマージをまとめて行う
    pub fn ingest(
        content_type: &str,
        method: Method,
        raw: &[u8],
        buckets: &mut ParamBuckets,
    ) -> Result<Option<ParameterBucket>, Error> {
        let decoded = Self::decode(content_type, raw)?;
        if let Some(bucket) = &decoded {
            debug!("Ingested JSON body with {} keys for {}", bucket.len(), method);
            Self::merge(method, bucket, buckets);
        }
        Ok(decoded)
    }

    /// ストリームを読み取って取り込む（成否にかかわらず読み取り後に巻き戻す）
    pub fn ingest_stream(
        content_type: &str,
        method: Method,
        stream: &mut BodyStream,
        buckets: &mut ParamBuckets,
    ) -> Result<Option<ParameterBucket>, Error> {
        if !is_json_content_type(content_type) {
            return Ok(None);
        }
        stream.rewind();
        let raw = stream.read_remaining();
        stream.rewind();
        Self::ingest(content_type, method, &raw?, buckets)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn buckets_with_query() -> ParamBuckets {
        let query: ParameterBucket = [("id", json!("1")), ("name", json!("query"))].into_iter().collect();
        ParamBuckets::new(query, ParameterBucket::new())
    }

    #[test]
    fn test_json_content_type_detection() {
        assert!(is_json_content_type("application/json"));
        assert!(is_json_content_type(" Application/JSON ; charset=utf-8"));
        assert!(!is_json_content_type("application/problem+json"));
        assert!(!is_json_content_type("text/plain"));
        assert!(!is_json_content_type(""));
    }

    #[test]
    fn test_decode_non_json_is_none() {
        assert!(BodyIngestor::decode("text/plain", b"{\"a\":1}").unwrap().is_none());
        assert!(BodyIngestor::decode("text/plain", b"").unwrap().is_none());
    }

    #[test]
    fn test_decode_empty_json_body_is_malformed() {
        let err = BodyIngestor::decode("application/json", b"").unwrap_err();
        assert!(matches!(err, Error::MalformedBody(_)));
        let err = BodyIngestor::decode("application/json", b"  \n").unwrap_err();
        assert_eq!(err.status_code(), 400);
    }

    #[test]
    fn test_decode_malformed() {
        let err = BodyIngestor::decode("application/json", b"{not json").unwrap_err();
        assert!(matches!(err, Error::MalformedBody(_)));

        let err = BodyIngestor::decode("application/json", b"[1,2]").unwrap_err();
        assert!(matches!(err, Error::MalformedBody(_)));
    }

    #[test]
    fn test_post_merges_into_post_and_request() {
        let mut buckets = buckets_with_query();
        BodyIngestor::ingest("application/json", Method::POST, br#"{"name":"body","n":2}"#, &mut buckets).unwrap();

        assert_eq!(buckets.post.get("name"), Some(&json!("body")));
        assert_eq!(buckets.request.get("name"), Some(&json!("body")));
        assert_eq!(buckets.request.get("id"), Some(&json!("1")));
        // queryは変わらない
        assert_eq!(buckets.query.get("name"), Some(&json!("query")));
        assert!(buckets.put.is_empty());
    }

    #[test]
    fn test_put_patch_update_merge_into_put() {
        for method in [Method::PUT, Method::PATCH, Method::UPDATE] {
            let mut buckets = buckets_with_query();
            BodyIngestor::ingest("application/json", method, br#"{"x":true}"#, &mut buckets).unwrap();
            assert_eq!(buckets.put.get("x"), Some(&json!(true)), "method {}", method);
            assert_eq!(buckets.request.get("x"), Some(&json!(true)));
            assert!(buckets.post.is_empty());
        }
    }

    #[test]
    fn test_get_merges_into_query_with_body_winning() {
        let mut buckets = buckets_with_query();
        BodyIngestor::ingest("application/json", Method::GET, br#"{"id":"9"}"#, &mut buckets).unwrap();
        assert_eq!(buckets.query.get("id"), Some(&json!("9")));
        assert_eq!(buckets.request.get("id"), Some(&json!("9")));
    }

    #[test]
    fn test_other_methods_are_noop() {
        let mut buckets = buckets_with_query();
        let before = buckets.clone();
        let decoded = BodyIngestor::ingest("application/json", Method::DELETE, br#"{"a":1}"#, &mut buckets).unwrap();
        assert!(decoded.is_some());
        assert_eq!(buckets, before);
    }

    #[test]
    fn test_ingest_is_deterministic() {
        let body = br#"{"a":1,"b":{"c":[1,2]}}"#;
        let mut first = buckets_with_query();
        let mut second = buckets_with_query();
        BodyIngestor::ingest("application/json", Method::POST, body, &mut first).unwrap();
        BodyIngestor::ingest("application/json", Method::POST, body, &mut second).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_ingest_stream_rewinds() {
        let mut stream = BodyStream::new(r#"{"k":"v"}"#);
        let mut buckets = ParamBuckets::default();
        BodyIngestor::ingest_stream("application/json", Method::POST, &mut stream, &mut buckets).unwrap();
        assert_eq!(stream.position(), 0);
        assert_eq!(buckets.post.get("k"), Some(&json!("v")));

        // 失敗しても巻き戻される
        let mut broken = BodyStream::new("{oops");
        assert!(BodyIngestor::ingest_stream("application/json", Method::POST, &mut broken, &mut buckets).is_err());
        assert_eq!(broken.position(), 0);
    }
}
