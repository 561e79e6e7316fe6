//! 環境変数ベースの設定

use std::env;
use std::path::PathBuf;

/// 静的ファイル配信・フロントコントローラー解決・ボディ上限の設定
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// 静的ファイルのドキュメントルート
    pub document_root: PathBuf,
    /// フロントコントローラーのスクリプト拡張子（ドットなし）
    pub script_extension: String,
    /// 論理パスを運ぶクエリパラメータ名
    pub path_param: String,
    /// リクエストボディの最大サイズ（バイト）
    pub max_body_size: usize,
}

pub const DEFAULT_MAX_BODY_SIZE: usize = 5 * 1024 * 1024; // 5MB

impl Default for Config {
    fn default() -> Self {
        Self {
            document_root: PathBuf::from("."),
            script_extension: "php".to_string(),
            path_param: "p".to_string(),
            max_body_size: DEFAULT_MAX_BODY_SIZE,
        }
    }
}

impl Config {
    /// 環境変数から設定を読み込む
    ///
    /// - `REQWRAP_DOCUMENT_ROOT`
    /// - `REQWRAP_SCRIPT_EXTENSION`
    /// - `REQWRAP_PATH_PARAM`
    /// - `REQWRAP_MAX_BODY_SIZE`
    ///
    /// 未設定・空・解釈できない値はデフォルトにフォールバックする。
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            document_root: non_empty_var("REQWRAP_DOCUMENT_ROOT")
                .map(PathBuf::from)
                .unwrap_or(defaults.document_root),
            script_extension: non_empty_var("REQWRAP_SCRIPT_EXTENSION")
                .map(|s| s.trim_start_matches('.').to_string())
                .unwrap_or(defaults.script_extension),
            path_param: non_empty_var("REQWRAP_PATH_PARAM").unwrap_or(defaults.path_param),
            max_body_size: non_empty_var("REQWRAP_MAX_BODY_SIZE")
                .and_then(|s| s.parse::<usize>().ok())
                .unwrap_or(defaults.max_body_size),
        }
    }

    pub fn with_document_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.document_root = root.into();
        self
    }

    pub fn with_script_extension(mut self, ext: impl Into<String>) -> Self {
        self.script_extension = ext.into().trim_start_matches('.').to_string();
        self
    }

    pub fn with_path_param(mut self, name: impl Into<String>) -> Self {
        self.path_param = name.into();
        self
    }

    pub fn with_max_body_size(mut self, size: usize) -> Self {
        self.max_body_size = size;
        self
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_env_defaults() {
        temp_env::with_vars(
            [
                ("REQWRAP_DOCUMENT_ROOT", None::<&str>),
                ("REQWRAP_SCRIPT_EXTENSION", None),
                ("REQWRAP_PATH_PARAM", None),
                ("REQWRAP_MAX_BODY_SIZE", None),
            ],
            || {
                assert_eq!(Config::from_env(), Config::default());
            },
        );
    }

    #[test]
    fn test_from_env_overrides() {
        temp_env::with_vars(
            [
                ("REQWRAP_DOCUMENT_ROOT", Some("/var/www")),
                ("REQWRAP_SCRIPT_EXTENSION", Some(".cgi")),
                ("REQWRAP_PATH_PARAM", Some("route")),
                ("REQWRAP_MAX_BODY_SIZE", Some("1024")),
            ],
            || {
                let config = Config::from_env();
                assert_eq!(config.document_root, PathBuf::from("/var/www"));
                assert_eq!(config.script_extension, "cgi");
                assert_eq!(config.path_param, "route");
                assert_eq!(config.max_body_size, 1024);
            },
        );
    }

    #[test]
    fn test_invalid_max_body_size_falls_back() {
        temp_env::with_var("REQWRAP_MAX_BODY_SIZE", Some("lots"), || {
            assert_eq!(Config::from_env().max_body_size, DEFAULT_MAX_BODY_SIZE);
        });
    }
}
