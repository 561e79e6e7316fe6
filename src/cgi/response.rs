//! CGIレスポンスの出力機能

use std::io::{self, Write};

use log::error;

use crate::common::{is_header_name_valid, is_header_value_valid};
use crate::error::Error;
use crate::response::Response;

fn write_err(what: &str) -> impl FnOnce(io::Error) -> Error + '_ {
    move |e| Error::InternalServerError(format!("Failed to write {}: {}", what, e))
}

/// レスポンスを任意のライターへ書き出す
///
/// `Status`・`Content-Length` は予約ヘッダーとして利用者の指定を無視する。
/// 不正なヘッダーが1つでもあれば、レスポンス全体を400に置き換える。
pub fn write_response_to<W: Write>(response: &Response, out: &mut W) -> Result<(), Error> {
    let mut lines: Vec<(String, String)> = Vec::new();
    let mut invalid = false;

    for (name, value) in response.headers() {
        if name.as_str().eq_ignore_ascii_case("Status") || name.as_str().eq_ignore_ascii_case("Content-Length") {
            continue;
        }
        let value = match value.to_str() {
            Ok(v) if is_header_name_valid(name.as_str()) && is_header_value_valid(v) => v,
            _ => {
                error!("Invalid header detected - name: '{}', value: {:?}", name, value);
                invalid = true;
                break;
            }
        };
        lines.push((canonical_header_name(name.as_str()), value.to_string()));
    }

    let fallback;
    let response = if invalid {
        fallback = Response::new(http::StatusCode::BAD_REQUEST).with_string_body("Bad Request: Invalid header");
        lines = vec![("Content-Type".to_string(), "text/plain; charset=utf-8".to_string())];
        &fallback
    } else {
        response
    };

    out.write_all(format!("Status: {} {}\r\n", response.status(), response.reason_phrase()).as_bytes())
        .map_err(write_err("status line"))?;

    for (name, value) in &lines {
        out.write_all(format!("{}: {}\r\n", name, value).as_bytes())
            .map_err(write_err("header"))?;
    }

    out.write_all(format!("Content-Length: {}\r\n", response.body().len()).as_bytes())
        .map_err(write_err("Content-Length"))?;
    out.write_all(b"\r\n").map_err(write_err("header/body separator"))?;
    out.write_all(response.body()).map_err(write_err("response body"))?;

    Ok(())
}

/// レスポンスを標準出力に書き出す
pub fn write_response(response: &Response) -> Result<(), Error> {
    let mut out = io::stdout().lock();
    let res = write_response_to(response, &mut out);
    out.flush()
        .map_err(|e| Error::InternalServerError(format!("Failed to flush stdout: {}", e)))?;
    res
}

/// `content-type` -> `Content-Type`
fn canonical_header_name(name: &str) -> String {
    name.split('-')
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                None => String::new(),
                Some(c) => c.to_ascii_uppercase().to_string() + chars.as_str(),
            }
        })
        .collect::<Vec<String>>()
        .join("-")
}
