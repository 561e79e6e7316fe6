//! レスポンスの生成

use http::StatusCode;
use serde::Serialize;

use crate::error::Error;
use super::core::Response;

/// レスポンスを生成するファクトリ
#[derive(Debug, Clone, Copy, Default)]
pub struct ResponseFactory;

impl ResponseFactory {
    pub fn new() -> Self {
        Self
    }

    /// ステータスと理由句を指定して空のレスポンスを作成
    pub fn create_response(&self, code: u16, reason: &str) -> Result<Response, Error> {
        Response::new(StatusCode::OK).with_status(code, reason)
    }

    /// JSONレスポンスを作成
    ///
    /// 追加ヘッダーを先に適用し、Content-Type は常に `application/json` で置き換える。
    pub fn create_json_response<T: Serialize + ?Sized>(
        &self,
        data: &T,
        code: u16,
        headers: &[(&str, &str)],
    ) -> Result<Response, Error> {
        let mut response = self.create_response(code, "")?;
        for (name, value) in headers {
            response = response.with_added_header(name, value)?;
        }
        response.with_json_body(data)
    }
}
