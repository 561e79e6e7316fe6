//! リクエストデコレーターと関連機能
//!
//! - パス解決（フロントコントローラー形式を含む）
//! - 静的ファイルの短絡配信
//! - JSONボディの取り込み
//! - リクエストの生成とCLIリクエスト

pub mod body;
pub mod cli;
pub mod context;
pub mod core;
pub mod factory;
pub mod path;
pub mod static_file;

pub use body::{is_json_content_type, BodyIngestor};
pub use cli::CliRequest;
pub use context::ServerContext;
pub use self::core::{Notice, Request, RequestState};
pub use factory::RequestFactory;
pub use path::{PathInput, PathResolver};
pub use static_file::{serve_static_file_if_present, static_file_mime, static_file_path};
