//! リクエスト属性の実装

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// アプリケーションがリクエストに付与する型付き属性
///
/// 値は `Arc` で共有されるため、リクエストの複製でも属性は失われない。
#[derive(Clone, Default)]
pub struct Attributes {
    values: HashMap<String, Arc<dyn Any + Send + Sync>>,
}

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    /// 値を設定
    pub fn set<T: Send + Sync + 'static>(&mut self, key: &str, value: T) {
        self.values.insert(key.to_string(), Arc::new(value));
    }

    /// 値を取得（型が一致しない場合はNone）
    pub fn get<T: 'static>(&self, key: &str) -> Option<&T> {
        self.values.get(key).and_then(|v| v.downcast_ref::<T>())
    }

    pub fn remove(&mut self, key: &str) -> bool {
        self.values.remove(key).is_some()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.values.keys()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl fmt::Debug for Attributes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<&String> = self.values.keys().collect();
        keys.sort();
        f.debug_struct("Attributes").field("keys", &keys).finish()
    }
}
