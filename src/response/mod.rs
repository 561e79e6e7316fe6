//! レスポンスデコレーターとファクトリ

pub mod core;
pub mod factory;

pub use self::core::Response;
pub use factory::ResponseFactory;
