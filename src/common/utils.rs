//! 共通ユーティリティ関数群（URLデコード、クエリ解析、ヘッダー検証 等）

use http::header::{HeaderName, HeaderValue};
use serde_json::{Map, Value};

use crate::error::Error;

use super::params::ParameterBucket;

/// `application/x-www-form-urlencoded` 形式のデコード（`+` は空白）
///
/// 不正な `%` エスケープはそのまま残し、不正なUTF-8は置換文字にする。
pub fn percent_decode(input: &str) -> String {
    let mut out = Vec::with_capacity(input.len());
    let mut bytes = input.as_bytes().iter();
    while let Some(&b) = bytes.next() {
        match b {
            b'+' => out.push(b' '),
            b'%' => {
                let rest = bytes.as_slice();
                match rest.get(..2).and_then(hex_pair) {
                    Some(decoded) => {
                        out.push(decoded);
                        bytes.nth(1);
                    }
                    None => out.push(b'%'),
                }
            }
            _ => out.push(b),
        }
    }
    String::from_utf8_lossy(&out).into_owned()
}

fn hex_pair(pair: &[u8]) -> Option<u8> {
    let hi = (pair[0] as char).to_digit(16)?;
    let lo = (pair[1] as char).to_digit(16)?;
    Some((hi * 16 + lo) as u8)
}

/// クエリ文字列（またはフォームボディ）をパースしてバケットに格納する
///
/// `p[]=a&p[]=b` は配列、`f[k]=v` はオブジェクトとして扱う。
pub fn parse_query_string(query_string: &str) -> ParameterBucket {
    let mut params = Map::new();

    for pair in query_string.split('&') {
        if pair.is_empty() {
            continue;
        }
        let mut parts = pair.splitn(2, '=');
        let key = percent_decode(parts.next().unwrap_or(""));
        let value = Value::String(percent_decode(parts.next().unwrap_or("")));
        if key.is_empty() {
            continue;
        }

        match key.find('[') {
            Some(open) if open > 0 && key.ends_with(']') => {
                let name = key[..open].to_string();
                let index = &key[open + 1..key.len() - 1];
                insert_bracketed(&mut params, name, index, value);
            }
            _ => {
                params.insert(key, value);
            }
        }
    }

    ParameterBucket::from_map(&params)
}

fn insert_bracketed(params: &mut Map<String, Value>, name: String, index: &str, value: Value) {
    let slot = params.entry(name).or_insert(Value::Null);
    if index.is_empty() {
        match slot {
            Value::Array(items) => items.push(value),
            Value::Object(map) => {
                let next = map.len().to_string();
                map.insert(next, value);
            }
            _ => *slot = Value::Array(vec![value]),
        }
    } else {
        if !slot.is_object() {
            // 配列に名前付きキーが混ざった場合はオブジェクトへ昇格
            let mut map = Map::new();
            if let Value::Array(items) = slot.take() {
                for (i, item) in items.into_iter().enumerate() {
                    map.insert(i.to_string(), item);
                }
            }
            *slot = Value::Object(map);
        }
        if let Value::Object(map) = slot {
            map.insert(index.to_string(), value);
        }
    }
}

/// `Cookie` ヘッダーを名前と値に分解する
pub fn parse_cookie_header(header: &str) -> ParameterBucket {
    header
        .split(';')
        .filter_map(|pair| {
            let mut parts = pair.trim().splitn(2, '=');
            let name = parts.next()?.trim();
            if name.is_empty() {
                return None;
            }
            let value = parts.next().unwrap_or("").trim().trim_matches('"');
            Some((name.to_string(), Value::String(percent_decode(value))))
        })
        .collect()
}

/// ヘッダー値に使用可能な文字かを判定（タブ以外の制御文字とCR/LFを拒否）
pub fn is_header_value_valid(value: &str) -> bool {
    !value.chars().any(|c| c != '\t' && c.is_ascii_control())
}

/// ヘッダー名がRFC 7230の token か
pub fn is_header_name_valid(name: &str) -> bool {
    const TCHAR_SYMBOLS: &str = "!#$%&'*+-.^_`|~";
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || TCHAR_SYMBOLS.contains(c))
}

/// ヘッダー名・値を `http` の型へ変換（不正なら `InvalidHeader`）
pub fn parse_header(name: &str, value: &str) -> Result<(HeaderName, HeaderValue), Error> {
    let header_name = HeaderName::from_bytes(name.as_bytes())
        .map_err(|e| Error::InvalidHeader(format!("Invalid header name {:?}: {}", name, e)))?;
    let header_value = HeaderValue::from_str(value)
        .map_err(|e| Error::InvalidHeader(format!("Invalid value for header {}: {}", name, e)))?;
    Ok((header_name, header_value))
}

/// `HTTP_X_AUTH_TOKEN` -> `X-Auth-Token` のように変換
pub fn cgi_var_to_header_name(key: &str) -> String {
    let mut name = String::with_capacity(key.len());
    for (i, part) in key.split('_').enumerate() {
        if i > 0 {
            name.push('-');
        }
        for (j, c) in part.chars().enumerate() {
            name.push(if j == 0 { c.to_ascii_uppercase() } else { c.to_ascii_lowercase() });
        }
    }
    name
}

/// `X-Auth-Token` -> `HTTP_X_AUTH_TOKEN`
pub fn header_name_to_server_key(name: &str) -> String {
    format!("HTTP_{}", name.to_ascii_uppercase().replace('-', "_"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_query_string() {
        let params = parse_query_string("name=John&age=30&city=Tokyo");

        assert_eq!(params.get("name"), Some(&json!("John")));
        assert_eq!(params.get("age"), Some(&json!("30")));
        assert_eq!(params.get("city"), Some(&json!("Tokyo")));
    }

    #[test]
    fn test_parse_query_string_url_encoding() {
        let query = "name=%E3%81%82%E3%81%84%E3%81%86%E3%81%88%E3%81%8A&city=Tokyo%20Station&lang=ja%2Den";
        let params = parse_query_string(query);

        // "あいうえお"（UTF-8でURLエンコード）
        assert_eq!(params.get("name"), Some(&json!("あいうえお")));
        assert_eq!(params.get("city"), Some(&json!("Tokyo Station")));
        assert_eq!(params.get("lang"), Some(&json!("ja-en")));
    }

    #[test]
    fn test_parse_query_string_arrays() {
        let params = parse_query_string("p%5B%5D=test&p[]=post&f[name]=x&plain=1");
        assert_eq!(params.get("p"), Some(&json!(["test", "post"])));
        assert_eq!(params.get("f"), Some(&json!({"name": "x"})));
        assert_eq!(params.get("plain"), Some(&json!("1")));
    }

    #[test]
    fn test_parse_query_string_empty() {
        assert!(parse_query_string("").is_empty());
        assert!(parse_query_string("&&").is_empty());
        let params = parse_query_string("flag");
        assert_eq!(params.get("flag"), Some(&json!("")));
    }

    #[test]
    fn test_percent_decode() {
        assert_eq!(percent_decode("Hello%20World"), "Hello World");
        assert_eq!(percent_decode("test%2Bvalue"), "test+value");
        assert_eq!(percent_decode("normal"), "normal");
        assert_eq!(percent_decode("plus+space"), "plus space");
        assert_eq!(percent_decode("trailing%2"), "trailing%2");
        assert_eq!(percent_decode("%41"), "A");
    }

    #[test]
    fn test_parse_cookie_header() {
        let cookies = parse_cookie_header("session=abc123; theme=dark ; empty=");
        assert_eq!(cookies.get("session"), Some(&json!("abc123")));
        assert_eq!(cookies.get("theme"), Some(&json!("dark")));
        assert_eq!(cookies.get("empty"), Some(&json!("")));
    }

    #[test]
    fn test_cgi_header_name_conversion() {
        assert_eq!(cgi_var_to_header_name("X_AUTH_TOKEN"), "X-Auth-Token");
        assert_eq!(cgi_var_to_header_name("CONTENT_TYPE"), "Content-Type");
        assert_eq!(header_name_to_server_key("X-Requested-With"), "HTTP_X_REQUESTED_WITH");
    }

    #[test]
    fn header_value_rejects_crlf_and_ctl() {
        assert!(is_header_value_valid("normal-Value_123"));
        assert!(!is_header_value_valid("bad\rvalue"));
        assert!(!is_header_value_valid("bad\nvalue"));
        assert!(!is_header_value_valid("bad\x07bell"));
        assert!(is_header_name_valid("X-Custom"));
        assert!(!is_header_name_valid("Bad Name"));
        assert!(!is_header_name_valid(""));
    }
}
