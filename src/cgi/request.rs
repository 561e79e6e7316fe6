//! CGI環境変数からのリクエストコンテキスト構築

use std::collections::BTreeMap;
use std::env;
use std::io::{self, Read};

use log::warn;

use crate::common::{cgi_var_to_header_name, is_header_name_valid, is_header_value_valid};
use crate::error::Error;
use crate::request::ServerContext;

/// 環境変数からHTTPヘッダーを取得する
///
/// `HTTP_*` と `CONTENT_TYPE`・`CONTENT_LENGTH` を対象とし、不正な名前・値は読み飛ばす。
pub fn get_cgi_headers() -> Vec<(String, String)> {
    let mut headers = Vec::new();
    for (key, value) in env::vars() {
        let header_name = if let Some(rest) = key.strip_prefix("HTTP_") {
            cgi_var_to_header_name(rest)
        } else if key == "CONTENT_TYPE" || key == "CONTENT_LENGTH" {
            cgi_var_to_header_name(&key)
        } else {
            continue;
        };
        if !is_header_name_valid(&header_name) || !is_header_value_valid(&value) {
            warn!("Skipping invalid CGI header: {}", key);
            continue;
        }
        headers.push((header_name, value));
    }
    headers.sort();
    headers
}

/// リクエストボディを読み込む（`CONTENT_LENGTH` バイト、上限超過は `PayloadTooLarge`）
pub fn read_request_body<R: Read>(input: &mut R, max_body_size: usize) -> Result<Vec<u8>, Error> {
    let content_length = env::var("CONTENT_LENGTH")
        .ok()
        .and_then(|v| v.trim().parse::<usize>().ok())
        .unwrap_or(0);
    if content_length == 0 {
        return Ok(Vec::new());
    }
    if content_length > max_body_size {
        return Err(Error::PayloadTooLarge(format!(
            "Request body size {} bytes exceeds maximum allowed size {} bytes",
            content_length, max_body_size
        )));
    }

    let mut buffer = vec![0u8; content_length];
    input
        .read_exact(&mut buffer)
        .map_err(|e| Error::InvalidRequest(format!("Failed to read request body: {}", e)))?;
    Ok(buffer)
}

/// リクエストURI（`REQUEST_URI`、なければ `PATH_INFO` + `QUERY_STRING`）
pub fn request_uri_from_env() -> String {
    match env::var("REQUEST_URI") {
        Ok(uri) if !uri.is_empty() => uri,
        _ => {
            let path = env::var("PATH_INFO").ok().filter(|p| !p.is_empty()).unwrap_or_else(|| "/".to_string());
            match env::var("QUERY_STRING") {
                Ok(qs) if !qs.is_empty() => format!("{}?{}", path, qs),
                _ => path,
            }
        }
    }
}

/// CGI環境変数と標準入力から `ServerContext` を構築する
pub fn context_from_env(max_body_size: usize) -> Result<ServerContext, Error> {
    context_from_reader(&mut io::stdin().lock(), max_body_size)
}

/// 任意の入力からボディを読む版
pub fn context_from_reader<R: Read>(input: &mut R, max_body_size: usize) -> Result<ServerContext, Error> {
    let method = env::var("REQUEST_METHOD")
        .map_err(|_| Error::InvalidRequest("REQUEST_METHOD environment variable not set".to_string()))?;

    let uri = request_uri_from_env();

    let protocol = env::var("SERVER_PROTOCOL")
        .ok()
        .and_then(|p| p.strip_prefix("HTTP/").map(str::to_string))
        .unwrap_or_else(|| "1.1".to_string());

    let server: BTreeMap<String, String> = env::vars().collect();
    let body = read_request_body(input, max_body_size)?;

    let mut ctx = ServerContext::new(method, uri).with_protocol_version(protocol);
    ctx.headers = get_cgi_headers();
    ctx.server = server;
    ctx.body = body.into();
    Ok(ctx.with_derived_params())
}
