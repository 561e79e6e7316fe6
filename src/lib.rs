//! reqwrap: HTTPリクエスト・レスポンスのデコレーター層
//!
//! フロントコントローラー形式のパス解決、JSONボディの取り込み、
//! リクエストデータの写像と2段階バリデーション、JSON/XMLレスポンスを提供する。
//! ルーティングそのものは [`common::Router`] として外部に委ねる。

pub mod common;
pub mod dto;
pub mod error;
pub mod handler;
pub mod request;
pub mod response;
pub mod validation;

#[cfg(feature = "cgi")]
pub mod cgi;

pub use common::{CliRoute, Config, Method, ParameterBucket, Route, Router};
pub use dto::{ErrorResponse, ErrorType, ExceptionSummary, SuccessResponse};
pub use error::Error;
pub use request::{CliRequest, Request, RequestFactory, ServerContext};
pub use response::{Response, ResponseFactory};
pub use validation::{RequestValidationMapper, ValidationResult};
