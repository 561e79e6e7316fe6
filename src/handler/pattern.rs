use log::{debug, warn};
use regex::Regex;
use serde_json::Value;

#[cfg(debug_assertions)]
use std::time::{Duration, Instant};

use crate::common::ParameterBucket;
use crate::error::Error;

/// パターンを `^...$` で挟み、パス全体との一致に限定する
pub fn ensure_safe_pattern(pattern: &str) -> Result<String, Error> {
    if pattern.is_empty() {
        return Err(Error::ConfigurationError("Empty regex pattern is not allowed".to_string()));
    }
    if pattern.starts_with('^') && pattern.ends_with('$') {
        return Ok(pattern.to_string());
    }

    let anchored = format!("^{}$", pattern.trim_start_matches('^').trim_end_matches('$'));
    debug!("Anchored route pattern '{}' as '{}'", pattern, anchored);
    Ok(anchored)
}

/// コンパイル済みのルートパターン
///
/// 登録時にコンパイルするため、不正なパターンはルート登録の時点でエラーになる。
#[derive(Debug, Clone)]
pub struct RoutePattern {
    source: String,
    regex: Regex,
}

impl RoutePattern {
    pub fn new(pattern: &str) -> Result<Self, Error> {
        let source = ensure_safe_pattern(pattern)?;
        let regex = Regex::new(&source)
            .map_err(|e| Error::ConfigurationError(format!("Invalid route pattern {}: {}", source, e)))?;
        Ok(Self { source, regex })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// パスの深さ（`/` の数）
    pub fn depth(&self) -> usize {
        self.source.matches('/').count()
    }

    /// 一致した場合、名前付きキャプチャをパラメータとして返す
    pub fn captures(&self, path: &str) -> Option<ParameterBucket> {
        #[cfg(debug_assertions)]
        let start_time = Instant::now();

        let captures = self.regex.captures(path);

        #[cfg(debug_assertions)]
        {
            let elapsed = start_time.elapsed();
            if elapsed > Duration::from_millis(100) {
                warn!(
                    "Slow regex matching detected: pattern '{}' took {:?} for path '{}'",
                    self.source, elapsed, path
                );
            }
        }

        debug!(
            "Path matching: {} against pattern {}: {}",
            path,
            self.source,
            captures.is_some()
        );

        let captures = captures?;
        let mut params = ParameterBucket::new();
        for name in self.regex.capture_names().flatten() {
            if let Some(m) = captures.name(name) {
                params.insert(name, Value::String(m.as_str().to_string()));
            }
        }
        Some(params)
    }
}

/// ルーティング対象のパス文字列（`/` + セグメントの連結）
pub fn segments_to_path(segments: &[String]) -> String {
    format!("/{}", segments.join("/"))
}
