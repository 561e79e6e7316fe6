//! 静的ファイルの短絡配信ガード
//!
//! パス解決の前に呼び出し、実在する静的ファイルならそのままレスポンスを返す。

use std::fs;
use std::path::{Component, Path, PathBuf};

use log::{debug, info};

use crate::common::{percent_decode, Config};
use crate::error::Error;
use crate::response::Response;

/// URLパスがドキュメントルート配下の静的ファイルを指していればその実パスを返す
///
/// スクリプト拡張子のファイル、ディレクトリ、`..` を含むパス、
/// ドキュメントルート外を指すシンボリックリンクは対象外。
pub fn static_file_path(uri_path: &str, config: &Config) -> Option<PathBuf> {
    let path_only = uri_path.split(&['?', '#'][..]).next().unwrap_or("");
    let decoded = percent_decode(path_only.trim_start_matches('/'));
    if decoded.is_empty() {
        return None;
    }

    let mut full = config.document_root.clone();
    for comp in Path::new(&decoded).components() {
        match comp {
            Component::Normal(s) => full.push(s),
            Component::CurDir => {}
            _ => {
                debug!("Rejected static path with non-normal component: {}", uri_path);
                return None;
            }
        }
    }

    let is_script = full
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case(&config.script_extension))
        .unwrap_or(false);
    if is_script {
        return None;
    }

    // シンボリックリンクを解決した実体もドキュメントルート配下に限る
    let root = fs::canonicalize(&config.document_root).ok()?;
    let target = fs::canonicalize(&full).ok()?;
    if !target.starts_with(&root) {
        debug!("Rejected static path outside document root: {}", uri_path);
        return None;
    }

    match fs::metadata(&target) {
        Ok(meta) if meta.is_file() => Some(full),
        _ => None,
    }
}

/// 静的ファイルのMIMEタイプ
///
/// 既知の拡張子は固定表、それ以外は `mime_guess` の推定値。
pub fn static_file_mime(path: &Path) -> String {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();
    match ext.as_str() {
        "css" => "text/css".to_string(),
        "scss" => "text/x-scss".to_string(),
        "sass" => "text/x-sass".to_string(),
        "csv" => "text/csv".to_string(),
        // css.map / js.map を含む
        "map" | "json" => "application/json".to_string(),
        "js" => "text/javascript".to_string(),
        _ => mime_guess::from_path(path).first_or_octet_stream().to_string(),
    }
}

/// 静的ファイルであれば200レスポンスを返す（対象外ならNone）
pub fn serve_static_file_if_present(uri_path: &str, config: &Config) -> Result<Option<Response>, Error> {
    let Some(path) = static_file_path(uri_path, config) else {
        return Ok(None);
    };

    let content = fs::read(&path)?;
    let mime = static_file_mime(&path);
    info!("Serving static file {} ({})", path.display(), mime);

    let response = Response::ok()
        .with_header("Content-Type", &mime)?
        .with_body(content);
    Ok(Some(response))
}
