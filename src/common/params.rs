//! パラメータバケット（クエリ・POST・PUT・統合ビュー）

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::{Map, Value};

/// 名前付きパラメータの順序付きマップ
///
/// キーは一意で、後から書き込んだ値が優先される。
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ParameterBucket(BTreeMap<String, Value>);

impl ParameterBucket {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(name.into(), value.into());
    }

    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.0.remove(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    /// 別のバケットを上書きマージする（`other` 側が勝つ）
    pub fn merge(&mut self, other: &ParameterBucket) {
        for (k, v) in other.iter() {
            self.0.insert(k.clone(), v.clone());
        }
    }

    /// JSONオブジェクトへ変換
    pub fn to_value(&self) -> Value {
        Value::Object(self.0.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
    }

    /// JSONオブジェクトから作成（オブジェクト以外はNone）
    pub fn from_value(value: &Value) -> Option<Self> {
        value.as_object().map(Self::from_map)
    }

    pub fn from_map(map: &Map<String, Value>) -> Self {
        Self(map.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for ParameterBucket {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// リクエストが持つ4つのバケット
///
/// `request` は構築時点で query の上に post を重ねたビュー。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParamBuckets {
    pub query: ParameterBucket,
    pub post: ParameterBucket,
    pub put: ParameterBucket,
    pub request: ParameterBucket,
}

impl ParamBuckets {
    pub fn new(query: ParameterBucket, post: ParameterBucket) -> Self {
        let mut request = query.clone();
        request.merge(&post);
        Self {
            query,
            post,
            put: ParameterBucket::new(),
            request,
        }
    }
}
