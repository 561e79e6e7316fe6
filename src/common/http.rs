//! HTTPメソッドの型付き表現

use std::fmt;
use serde::{Deserialize, Serialize};

/// リクエスト種別
///
/// `UPDATE` と `CLI` はHTTP標準外だが、ルーティング上の種別として扱う。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[allow(clippy::upper_case_acronyms)]
pub enum Method {
    GET,
    POST,
    PUT,
    DELETE,
    PATCH,
    HEAD,
    OPTIONS,
    UPDATE,
    CLI,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Method {
    /// 文字列からMethodに変換
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(method: &str) -> Option<Self> {
        match method.trim().to_uppercase().as_str() {
            "GET" => Some(Method::GET),
            "POST" => Some(Method::POST),
            "PUT" => Some(Method::PUT),
            "DELETE" => Some(Method::DELETE),
            "PATCH" => Some(Method::PATCH),
            "HEAD" => Some(Method::HEAD),
            "OPTIONS" => Some(Method::OPTIONS),
            "UPDATE" => Some(Method::UPDATE),
            "CLI" => Some(Method::CLI),
            _ => None,
        }
    }

    /// 文字列から変換し、未知のメソッドはGETとして扱う
    pub fn parse_or_default(method: &str) -> Self {
        Self::from_str(method).unwrap_or(Method::GET)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Method::GET => "GET",
            Method::POST => "POST",
            Method::PUT => "PUT",
            Method::DELETE => "DELETE",
            Method::PATCH => "PATCH",
            Method::HEAD => "HEAD",
            Method::OPTIONS => "OPTIONS",
            Method::UPDATE => "UPDATE",
            Method::CLI => "CLI",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_from_str() {
        assert_eq!(Method::from_str("get"), Some(Method::GET));
        assert_eq!(Method::from_str("Update"), Some(Method::UPDATE));
        assert_eq!(Method::from_str("BREW"), None);
    }

    #[test]
    fn test_unknown_method_defaults_to_get() {
        assert_eq!(Method::parse_or_default("BREW"), Method::GET);
        assert_eq!(Method::parse_or_default(""), Method::GET);
        assert_eq!(Method::parse_or_default("post"), Method::POST);
    }

    #[test]
    fn test_method_display() {
        assert_eq!(Method::PATCH.to_string(), "PATCH");
        assert_eq!(Method::CLI.to_string(), "CLI");
    }
}
