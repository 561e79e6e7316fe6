//! エラー型の定義

use thiserror::Error;

use crate::dto::ErrorType;
use crate::validation::{ValidationFailure, ValidationMultiFailure};

/// アプリケーションのエラー型
#[derive(Error, Debug)]
pub enum Error {
    /// ルートが見つからない
    #[error("Route \"{method} {path}\" was not found")]
    RouteNotFound { method: String, path: String },

    /// JSONボディのデコード失敗
    #[error("Malformed request body: {0}")]
    MalformedBody(String),

    /// 単一パスのバリデーション失敗
    #[error(transparent)]
    Validation(#[from] ValidationFailure),

    /// 複数パスのバリデーション失敗
    #[error(transparent)]
    ValidationMulti(#[from] ValidationMultiFailure),

    /// 前提条件を満たさない呼び出し
    #[error("{0}")]
    NotReady(String),

    /// レスポンスのシリアライズエラー
    #[error("Failed to serialize response: {0}")]
    SerializationError(String),

    /// 不正なヘッダー
    #[error("Invalid header: {0}")]
    InvalidHeader(String),

    /// 不正なリクエスト（メソッド・URI・プロトコル等）
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// CLIのパスが空
    #[error("CLI path is empty")]
    MissingCliPath,

    /// リクエストボディが大きすぎる
    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),

    /// 設定エラー
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// 入出力エラー
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// 内部サーバーエラー
    #[error("Internal server error: {0}")]
    InternalServerError(String),
}

impl Error {
    /// エラーからHTTPステータスコードを取得
    pub fn status_code(&self) -> u16 {
        match self {
            Error::RouteNotFound { .. } => 404,
            Error::MalformedBody(_) => 400,
            Error::Validation(_) => 400,
            Error::ValidationMulti(_) => 400,
            Error::InvalidHeader(_) => 400,
            Error::InvalidRequest(_) => 400,
            Error::MissingCliPath => 400,
            Error::PayloadTooLarge(_) => 413,
            Error::NotReady(_) => 500,
            Error::SerializationError(_) => 500,
            Error::ConfigurationError(_) => 500,
            Error::Io(_) => 500,
            Error::InternalServerError(_) => 500,
        }
    }

    /// エラーレスポンスで使う種別
    pub fn error_type(&self) -> ErrorType {
        match self {
            Error::Validation(_) | Error::ValidationMulti(_) | Error::MalformedBody(_) => {
                ErrorType::Validation
            }
            Error::RouteNotFound { .. } => ErrorType::ResourceNotFound,
            _ => ErrorType::Internal,
        }
    }
}
