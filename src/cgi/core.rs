//! CGIメイン実行ロジック

use std::collections::BTreeMap;

use log::{debug, error, info, warn};
use tokio::task;

use crate::error::Error;
use crate::request::{serve_static_file_if_present, RequestFactory, ServerContext};
use crate::response::Response;

use super::redact::PanicContext;
use super::request::{context_from_env, request_uri_from_env};
use super::response::write_response;

/// CGI環境のリクエストを処理し、レスポンスを標準出力へ書き出す
///
/// 静的ファイルは短絡して返す。ハンドラー内のpanicは500レスポンスに変換する。
/// エラーを返すのはレスポンスの書き出しに失敗した場合のみ。
pub async fn run_cgi(factory: RequestFactory) -> Result<(), Error> {
    let response = process(&factory).await;
    write_response(&response)?;
    info!("CGI request processed with status {}", response.status());
    Ok(())
}

async fn process(factory: &RequestFactory) -> Response {
    let uri = request_uri_from_env();
    let uri_path = uri.split(&['?', '#'][..]).next().unwrap_or("/");

    match serve_static_file_if_present(uri_path, factory.config()) {
        Ok(Some(res)) => return res,
        Ok(None) => {}
        Err(e) => {
            error!("Failed to serve static file {}: {}", uri_path, e);
            return Response::from_error(&e);
        }
    }

    let ctx = match context_from_env(factory.config().max_body_size) {
        Ok(ctx) => ctx,
        Err(e) => {
            warn!("Rejected CGI request: {}", e);
            return Response::from_error(&e);
        }
    };

    handle_context(factory, ctx).await
}

/// コンテキストからリクエストを作成し、別タスクで処理する
pub async fn handle_context(factory: &RequestFactory, ctx: ServerContext) -> Response {
    let method = ctx.method.clone();
    let uri = ctx.uri.clone();
    let server: BTreeMap<String, String> = ctx.server.clone();

    let request = match factory.create(ctx) {
        Ok(req) => req,
        Err(e) => {
            warn!("Failed to build request for {} {}: {}", method, uri, e);
            return Response::from_error(&e);
        }
    };

    debug!("Processing CGI request: {} {}", method, uri);

    // ハンドラ内でのpanicを検知するためにspawnしてJoinErrorを検査
    let task_result = task::spawn(async move {
        let mut request = request;
        request.handle().await
    })
    .await;

    match task_result {
        Ok(Ok(res)) => res,
        Ok(Err(err)) => {
            if err.status_code() >= 500 {
                error!("Handler returned error at {} {}: {}", method, uri, err);
            } else {
                info!("Request {} {} failed: {}", method, uri, err);
            }
            Response::from_error(&err)
        }
        Err(join_err) => {
            let panic_info = if join_err.is_panic() {
                "panic occurred in handler".to_string()
            } else {
                format!("task cancelled: {}", join_err)
            };
            error!("{} at {} {}", panic_info, method, uri);
            if join_err.is_panic() {
                error!("{}", PanicContext::new(&method, &uri, &server));
            }
            Response::from_error(&Error::InternalServerError(panic_info))
        }
    }
}
