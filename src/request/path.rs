//! リクエストパスの解決

use http::Uri;
use serde_json::Value;

use crate::common::{Config, ParameterBucket};

/// パス解決の入力
#[derive(Debug, Clone, Copy)]
pub enum PathInput<'a> {
    /// URL・パス文字列
    Target(&'a str),
    /// 既に分割済みのセグメント
    Segments(&'a [String]),
}

/// URL・セグメント配列から小文字のパスセグメント列を得る
#[derive(Debug, Clone)]
pub struct PathResolver {
    script_extension: String,
    path_param: String,
}

impl Default for PathResolver {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl PathResolver {
    pub fn new(script_extension: impl Into<String>, path_param: impl Into<String>) -> Self {
        Self {
            script_extension: script_extension.into().trim_start_matches('.').to_string(),
            path_param: path_param.into(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.script_extension.clone(), config.path_param.clone())
    }

    /// 入力をパスセグメントへ変換する（純粋関数）
    ///
    /// - `Segments`: 各要素を小文字化（順序維持、空要素も残す）
    /// - `Target`: パス部分を `/` で分割し、空セグメントを除いて小文字化
    pub fn resolve(&self, input: PathInput<'_>) -> Vec<String> {
        match input {
            PathInput::Segments(segments) => segments.iter().map(|s| s.to_lowercase()).collect(),
            PathInput::Target(target) => split_segments(extract_path(target)),
        }
    }

    /// フロントコントローラー規則を適用してリクエストのパスを解決する
    ///
    /// `uri_path` がスクリプト拡張子で終わる場合、論理パスはクエリの
    /// `path_param` から取る（配列ならセグメント、文字列ならURL、それ以外は空）。
    pub fn resolve_request(&self, uri_path: &str, query: &ParameterBucket) -> Vec<String> {
        if !self.is_front_controller(uri_path) {
            return self.resolve(PathInput::Target(uri_path));
        }

        match query.get(&self.path_param) {
            Some(Value::Array(items)) => {
                let segments: Vec<String> = items.iter().map(value_to_segment).collect();
                self.resolve(PathInput::Segments(&segments))
            }
            Some(Value::Object(map)) => {
                // `p[0]=a&p[1]=b` のような添字付き形式
                let segments: Vec<String> = map.values().map(value_to_segment).collect();
                self.resolve(PathInput::Segments(&segments))
            }
            Some(Value::String(s)) => self.resolve(PathInput::Target(s)),
            _ => Vec::new(),
        }
    }

    /// パスがフロントコントローラースクリプトを指すか
    pub fn is_front_controller(&self, uri_path: &str) -> bool {
        if self.script_extension.is_empty() {
            return false;
        }
        let path = extract_path(uri_path);
        path.len() > self.script_extension.len()
            && path.ends_with(&self.script_extension)
            && path[..path.len() - self.script_extension.len()].ends_with('.')
    }
}

fn value_to_segment(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn split_segments(path: &str) -> Vec<String> {
    path.split('/')
        .filter(|s| !s.is_empty())
        .map(|s| s.to_lowercase())
        .collect()
}

/// URL文字列からパス部分を取り出す
///
/// 先頭の連続スラッシュは authority と誤認されないよう1つに畳む。
fn extract_path(target: &str) -> &str {
    let collapsed = if target.starts_with("//") {
        &target[target.len() - target.trim_start_matches('/').len() - 1..]
    } else {
        target
    };

    match collapsed.parse::<Uri>() {
        Ok(uri) if uri.scheme().is_some() || collapsed.starts_with('/') => {
            let path = uri.path();
            // Uri::path は元の文字列の一部なので、位置を求めて借用を返す
            match collapsed.find(path) {
                Some(start) if !path.is_empty() => &collapsed[start..start + path.len()],
                _ => strip_query_and_fragment(collapsed),
            }
        }
        _ => strip_query_and_fragment(collapsed),
    }
}

fn strip_query_and_fragment(target: &str) -> &str {
    let end = target.find(&['?', '#'][..]).unwrap_or(target.len());
    &target[..end]
}
