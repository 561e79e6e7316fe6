//! CGI環境での実行をサポートするモジュール
//!
//! 環境変数と標準入力からリクエストを構築し、
//! 標準出力にHTTPレスポンスフォーマットで出力するための機能を提供します。

pub mod redact;
pub mod request;
pub mod response;
pub mod core;

pub use self::core::{handle_context, run_cgi};
pub use request::context_from_env;
pub use response::{write_response, write_response_to};
