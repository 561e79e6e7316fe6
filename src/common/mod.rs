//! 共通の型・設定・トレイト定義

pub mod attributes;
pub mod config;
pub mod http;
pub mod params;
pub mod stream;
pub mod traits;
pub mod utils;

pub use attributes::Attributes;
pub use config::Config;
pub use http::Method;
pub use params::{ParamBuckets, ParameterBucket};
pub use stream::BodyStream;
pub use traits::{CliRoute, Route, Router};
pub use utils::*;

#[cfg(test)]
pub use traits::MockRouter;
