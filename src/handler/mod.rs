//! 参照実装のルーター（正規表現ルートテーブル）

pub mod pattern;
pub mod core;
pub mod builders;
pub mod table;

pub use self::core::{AsyncRouteHandler, CliRouteHandler, PatternRoute, RouteHandler};
pub use builders::{async_get, async_post, cli, delete, get, options, patch, post, put, route};
pub use pattern::{ensure_safe_pattern, RoutePattern};
pub use table::RouteTable;

#[cfg(test)]
mod tests;
