//! 型を強制しないJSON値のデシリアライザ
//!
//! クエリ文字列やフォーム由来の値は文字列で届くため、数値・真偽値への変換、
//! 数値から文字列への変換、スカラーから1要素の配列への変換を許容する。
//! エラーには値の位置（`address.street`・`items[0]`）を記録する。

use std::collections::BTreeSet;
use std::fmt;

use serde::de::value::BorrowedStrDeserializer;
use serde::de::{self, DeserializeOwned, DeserializeSeed, Deserializer, IntoDeserializer, MapAccess, SeqAccess, Unexpected, Visitor};
use serde::forward_to_deserialize_any;
use serde_json::{Map, Value};

/// 写像の失敗（位置付き）
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MappingError {
    #[error("missing field `{field}`")]
    Missing { field: String, path: Option<String> },
    #[error("{message}")]
    Invalid { message: String, path: Option<String> },
}

impl de::Error for MappingError {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        MappingError::Invalid {
            message: msg.to_string(),
            path: None,
        }
    }

    fn missing_field(field: &'static str) -> Self {
        MappingError::Missing {
            field: field.to_string(),
            path: None,
        }
    }
}

impl MappingError {
    /// 値の位置（ルートの型不一致は空文字列）
    pub fn path(&self) -> &str {
        match self {
            MappingError::Missing { path: Some(path), .. } | MappingError::Invalid { path: Some(path), .. } => path,
            MappingError::Missing { field, path: None } => field,
            MappingError::Invalid { path: None, .. } => "",
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, MappingError::Missing { .. })
    }

    // 位置が未設定なら `at` を起点に設定する（最も内側の位置が優先）
    fn located(self, at: &str) -> Self {
        match self {
            MappingError::Missing { field, path: None } => {
                let path = Some(key_path(at, &field));
                MappingError::Missing { field, path }
            }
            MappingError::Invalid { message, path: None } => MappingError::Invalid {
                message,
                path: Some(at.to_string()),
            },
            located => located,
        }
    }
}

fn key_path(parent: &str, key: &str) -> String {
    if parent.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", parent, key)
    }
}

fn index_path(parent: &str, index: usize) -> String {
    format!("{}[{}]", parent, index)
}

type Error = MappingError;

/// 写像できない値を既定値に置き換えながら写像し、すべての失敗を集める
///
/// 欠けた必須フィールド・変換できない値は、その位置を既定値（0・空文字列・空配列等）
/// で埋めて再試行する。既定値を作れない型（enum）が残った場合のみオブジェクトはNone。
pub fn recover<T: DeserializeOwned>(value: &Value, coerce: bool) -> (Option<T>, Vec<MappingError>) {
    let mut zeroed = BTreeSet::new();
    let mut errors = Vec::new();
    loop {
        let attempt = if zeroed.contains("") {
            T::deserialize(Zero)
        } else {
            T::deserialize(Lenient::recovering(value, &zeroed, coerce))
        };
        match attempt {
            Ok(object) => return (Some(object), errors),
            Err(err) => {
                if !zeroed.insert(err.path().to_string()) {
                    return (None, errors);
                }
                errors.push(err);
            }
        }
    }
}

/// `&Value` を寛容に読み取るデシリアライザ
#[derive(Debug, Clone)]
pub struct Lenient<'de, 'z> {
    value: &'de Value,
    path: String,
    zeroed: Option<&'z BTreeSet<String>>,
    coerce: bool,
}

impl<'de, 'z> Lenient<'de, 'z> {
    pub fn new(value: &'de Value) -> Self {
        Self {
            value,
            path: String::new(),
            zeroed: None,
            coerce: true,
        }
    }

    fn recovering(value: &'de Value, zeroed: &'z BTreeSet<String>, coerce: bool) -> Self {
        Self {
            value,
            path: String::new(),
            zeroed: Some(zeroed),
            coerce,
        }
    }

    fn is_zeroed(&self, path: &str) -> bool {
        self.zeroed.map_or(false, |zeroed| zeroed.contains(path))
    }

    fn deserialize_child<S: DeserializeSeed<'de>>(
        &self,
        seed: S,
        value: &'de Value,
        path: String,
    ) -> Result<S::Value, Error> {
        let result = if self.is_zeroed(&path) {
            seed.deserialize(Zero)
        } else {
            seed.deserialize(Lenient {
                value,
                path: path.clone(),
                zeroed: self.zeroed,
                coerce: self.coerce,
            })
        };
        result.map_err(|e| e.located(&path))
    }

    fn integer<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        if !self.coerce {
            return self.deserialize_any(visitor);
        }
        match self.value {
            Value::Number(n) => {
                if let Some(u) = n.as_u64() {
                    visitor.visit_u64(u)
                } else if let Some(i) = n.as_i64() {
                    visitor.visit_i64(i)
                } else {
                    match n.as_f64() {
                        Some(f) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => visitor.visit_i64(f as i64),
                        Some(f) => visitor.visit_f64(f),
                        None => self.deserialize_any(visitor),
                    }
                }
            }
            Value::String(s) => {
                let t = s.trim();
                if let Ok(u) = t.parse::<u64>() {
                    visitor.visit_u64(u)
                } else if let Ok(i) = t.parse::<i64>() {
                    visitor.visit_i64(i)
                } else {
                    match t.parse::<f64>() {
                        Ok(f) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => visitor.visit_i64(f as i64),
                        _ => Err(de::Error::invalid_type(Unexpected::Str(s), &visitor)),
                    }
                }
            }
            Value::Bool(b) => visitor.visit_u64(u64::from(*b)),
            _ => self.deserialize_any(visitor),
        }
    }

    fn float<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        if !self.coerce {
            return self.deserialize_any(visitor);
        }
        match self.value {
            Value::Number(n) => match n.as_f64() {
                Some(f) => visitor.visit_f64(f),
                None => self.deserialize_any(visitor),
            },
            Value::String(s) => match s.trim().parse::<f64>() {
                Ok(f) => visitor.visit_f64(f),
                Err(_) => Err(de::Error::invalid_type(Unexpected::Str(s), &visitor)),
            },
            Value::Bool(b) => visitor.visit_f64(if *b { 1.0 } else { 0.0 }),
            _ => self.deserialize_any(visitor),
        }
    }
}

impl<'de, 'z> Deserializer<'de> for Lenient<'de, 'z> {
    type Error = Error;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        match self.value {
            Value::Null => visitor.visit_unit(),
            Value::Bool(b) => visitor.visit_bool(*b),
            Value::Number(n) => {
                if let Some(u) = n.as_u64() {
                    visitor.visit_u64(u)
                } else if let Some(i) = n.as_i64() {
                    visitor.visit_i64(i)
                } else {
                    visitor.visit_f64(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            Value::String(s) => visitor.visit_borrowed_str(s),
            Value::Array(items) => visitor.visit_seq(LenientSeq::new(self.clone(), items.iter())),
            Value::Object(map) => visitor.visit_map(LenientMap::new(self.clone(), Some(map), Vec::new())),
        }
    }

    fn deserialize_bool<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        if !self.coerce {
            return self.deserialize_any(visitor);
        }
        match self.value {
            Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "1" | "on" | "yes" => visitor.visit_bool(true),
                "false" | "0" | "off" | "no" | "" => visitor.visit_bool(false),
                _ => Err(de::Error::invalid_type(Unexpected::Str(s), &visitor)),
            },
            Value::Number(n) => visitor.visit_bool(n.as_f64().map(|f| f != 0.0).unwrap_or(false)),
            _ => self.deserialize_any(visitor),
        }
    }

    fn deserialize_i8<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        self.integer(visitor)
    }

    fn deserialize_i16<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        self.integer(visitor)
    }

    fn deserialize_i32<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        self.integer(visitor)
    }

    fn deserialize_i64<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        self.integer(visitor)
    }

    fn deserialize_u8<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        self.integer(visitor)
    }

    fn deserialize_u16<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        self.integer(visitor)
    }

    fn deserialize_u32<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        self.integer(visitor)
    }

    fn deserialize_u64<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        self.integer(visitor)
    }

    fn deserialize_f32<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        self.float(visitor)
    }

    fn deserialize_f64<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        self.float(visitor)
    }

    fn deserialize_char<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        self.deserialize_str(visitor)
    }

    fn deserialize_str<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        match self.value {
            Value::String(s) => visitor.visit_borrowed_str(s),
            Value::Number(n) if self.coerce => visitor.visit_string(n.to_string()),
            Value::Bool(b) if self.coerce => visitor.visit_string(b.to_string()),
            _ => self.deserialize_any(visitor),
        }
    }

    fn deserialize_string<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        self.deserialize_str(visitor)
    }

    fn deserialize_bytes<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        match self.value {
            Value::String(s) => visitor.visit_borrowed_bytes(s.as_bytes()),
            _ => self.deserialize_any(visitor),
        }
    }

    fn deserialize_byte_buf<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        self.deserialize_bytes(visitor)
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        match self.value {
            Value::Null => visitor.visit_none(),
            _ => visitor.visit_some(self),
        }
    }

    fn deserialize_unit<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        match self.value {
            Value::Null => visitor.visit_unit(),
            _ => self.deserialize_any(visitor),
        }
    }

    fn deserialize_unit_struct<V: Visitor<'de>>(self, _name: &'static str, visitor: V) -> Result<V::Value, Error> {
        self.deserialize_unit(visitor)
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(self, _name: &'static str, visitor: V) -> Result<V::Value, Error> {
        visitor.visit_newtype_struct(self)
    }

    /// 配列はそのまま、オブジェクトは値の列、null は空、スカラーは1要素の列として扱う
    fn deserialize_seq<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        let value = self.value;
        match value {
            Value::Array(items) => visitor.visit_seq(LenientSeq::new(self, items.iter())),
            _ if !self.coerce => self.deserialize_any(visitor),
            Value::Object(map) => visitor.visit_seq(LenientSeq::new(self, map.values())),
            Value::Null => visitor.visit_seq(LenientSeq::new(self, std::iter::empty::<&Value>())),
            scalar => visitor.visit_seq(LenientSeq::new(self, std::iter::once(scalar))),
        }
    }

    fn deserialize_tuple<V: Visitor<'de>>(self, _len: usize, visitor: V) -> Result<V::Value, Error> {
        self.deserialize_seq(visitor)
    }

    fn deserialize_tuple_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _len: usize,
        visitor: V,
    ) -> Result<V::Value, Error> {
        self.deserialize_seq(visitor)
    }

    fn deserialize_map<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        let value = self.value;
        match value {
            Value::Object(map) => visitor.visit_map(LenientMap::new(self, Some(map), Vec::new())),
            Value::Null if self.coerce => visitor.visit_map(LenientMap::new(self, None, Vec::new())),
            _ => self.deserialize_any(visitor),
        }
    }

    /// 既定値で埋めると決まった欠落フィールドは、既定値のキーとして補う
    fn deserialize_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Error> {
        let value = self.value;
        let present = |field: &str| matches!(value, Value::Object(map) if map.contains_key(field));
        let filled: Vec<&'static str> = fields
            .iter()
            .copied()
            .filter(|field| !present(*field) && self.is_zeroed(&key_path(&self.path, field)))
            .collect();

        match value {
            Value::Object(map) => visitor.visit_map(LenientMap::new(self, Some(map), filled)),
            Value::Null if self.coerce => visitor.visit_map(LenientMap::new(self, None, filled)),
            _ => self.deserialize_any(visitor),
        }
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        name: &'static str,
        variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Error> {
        self.value
            .deserialize_enum(name, variants, visitor)
            .map_err(|e| de::Error::custom(e))
    }

    fn deserialize_identifier<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        self.deserialize_str(visitor)
    }

    fn deserialize_ignored_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        visitor.visit_unit()
    }

    forward_to_deserialize_any! {
        i128 u128
    }
}

impl<'de, 'z> IntoDeserializer<'de, Error> for Lenient<'de, 'z> {
    type Deserializer = Self;

    fn into_deserializer(self) -> Self {
        self
    }
}

struct LenientSeq<'de, 'z, I> {
    parent: Lenient<'de, 'z>,
    iter: I,
    index: usize,
}

impl<'de, 'z, I> LenientSeq<'de, 'z, I> {
    fn new(parent: Lenient<'de, 'z>, iter: I) -> Self {
        Self { parent, iter, index: 0 }
    }
}

impl<'de, 'z, I> SeqAccess<'de> for LenientSeq<'de, 'z, I>
where
    I: Iterator<Item = &'de Value>,
{
    type Error = Error;

    fn next_element_seed<T: DeserializeSeed<'de>>(&mut self, seed: T) -> Result<Option<T::Value>, Error> {
        let Some(value) = self.iter.next() else {
            return Ok(None);
        };
        let path = index_path(&self.parent.path, self.index);
        self.index += 1;
        self.parent.deserialize_child(seed, value, path).map(Some)
    }

    fn size_hint(&self) -> Option<usize> {
        match self.iter.size_hint() {
            (lower, Some(upper)) if lower == upper => Some(upper),
            _ => None,
        }
    }
}

enum Pending<'de> {
    Present(&'de str, &'de Value),
    Filled(&'static str),
}

struct LenientMap<'de, 'z> {
    parent: Lenient<'de, 'z>,
    iter: Option<serde_json::map::Iter<'de>>,
    filled: std::vec::IntoIter<&'static str>,
    pending: Option<Pending<'de>>,
}

impl<'de, 'z> LenientMap<'de, 'z> {
    fn new(parent: Lenient<'de, 'z>, map: Option<&'de Map<String, Value>>, filled: Vec<&'static str>) -> Self {
        Self {
            parent,
            iter: map.map(Map::iter),
            filled: filled.into_iter(),
            pending: None,
        }
    }
}

impl<'de, 'z> MapAccess<'de> for LenientMap<'de, 'z> {
    type Error = Error;

    fn next_key_seed<K: DeserializeSeed<'de>>(&mut self, seed: K) -> Result<Option<K::Value>, Error> {
        let key: &'de str = if let Some((key, value)) = self.iter.as_mut().and_then(|it| it.next()) {
            self.pending = Some(Pending::Present(key.as_str(), value));
            key.as_str()
        } else if let Some(field) = self.filled.next() {
            self.pending = Some(Pending::Filled(field));
            field
        } else {
            return Ok(None);
        };
        seed.deserialize(BorrowedStrDeserializer::<Error>::new(key)).map(Some)
    }

    fn next_value_seed<V: DeserializeSeed<'de>>(&mut self, seed: V) -> Result<V::Value, Error> {
        match self.pending.take() {
            Some(Pending::Present(key, value)) => {
                let path = key_path(&self.parent.path, key);
                self.parent.deserialize_child(seed, value, path)
            }
            Some(Pending::Filled(field)) => {
                let path = key_path(&self.parent.path, field);
                seed.deserialize(Zero).map_err(|e| e.located(&path))
            }
            None => Err(de::Error::custom("value is missing")),
        }
    }

    fn size_hint(&self) -> Option<usize> {
        let present = self.iter.as_ref().map_or(0, |it| it.len());
        Some(present + self.filled.len())
    }
}

/// 要求された型の既定値（0・false・空文字列・空の列・全フィールド既定の構造体）を返す
struct Zero;

impl<'de> Deserializer<'de> for Zero {
    type Error = Error;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        visitor.visit_unit()
    }

    fn deserialize_bool<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        visitor.visit_bool(false)
    }

    fn deserialize_i8<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        visitor.visit_i64(0)
    }

    fn deserialize_i16<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        visitor.visit_i64(0)
    }

    fn deserialize_i32<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        visitor.visit_i64(0)
    }

    fn deserialize_i64<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        visitor.visit_i64(0)
    }

    fn deserialize_u8<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        visitor.visit_u64(0)
    }

    fn deserialize_u16<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        visitor.visit_u64(0)
    }

    fn deserialize_u32<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        visitor.visit_u64(0)
    }

    fn deserialize_u64<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        visitor.visit_u64(0)
    }

    fn deserialize_f32<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        visitor.visit_f64(0.0)
    }

    fn deserialize_f64<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        visitor.visit_f64(0.0)
    }

    fn deserialize_char<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        visitor.visit_char('\0')
    }

    fn deserialize_str<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        visitor.visit_borrowed_str("")
    }

    fn deserialize_string<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        visitor.visit_borrowed_str("")
    }

    fn deserialize_bytes<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        visitor.visit_borrowed_bytes(&[])
    }

    fn deserialize_byte_buf<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        visitor.visit_borrowed_bytes(&[])
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        visitor.visit_none()
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(self, _name: &'static str, visitor: V) -> Result<V::Value, Error> {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_seq<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        visitor.visit_seq(ZeroSeq(0))
    }

    fn deserialize_tuple<V: Visitor<'de>>(self, len: usize, visitor: V) -> Result<V::Value, Error> {
        visitor.visit_seq(ZeroSeq(len))
    }

    fn deserialize_tuple_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        len: usize,
        visitor: V,
    ) -> Result<V::Value, Error> {
        visitor.visit_seq(ZeroSeq(len))
    }

    fn deserialize_map<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        visitor.visit_map(ZeroFields(NO_FIELDS.iter()))
    }

    fn deserialize_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Error> {
        visitor.visit_map(ZeroFields(fields.iter()))
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        name: &'static str,
        _variants: &'static [&'static str],
        _visitor: V,
    ) -> Result<V::Value, Error> {
        Err(de::Error::custom(format!("enum {} has no default value", name)))
    }

    fn deserialize_identifier<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        visitor.visit_borrowed_str("")
    }

    forward_to_deserialize_any! {
        i128 u128 unit unit_struct ignored_any
    }
}

struct ZeroSeq(usize);

impl<'de> SeqAccess<'de> for ZeroSeq {
    type Error = Error;

    fn next_element_seed<T: DeserializeSeed<'de>>(&mut self, seed: T) -> Result<Option<T::Value>, Error> {
        if self.0 == 0 {
            return Ok(None);
        }
        self.0 -= 1;
        seed.deserialize(Zero).map(Some)
    }
}

const NO_FIELDS: &[&str] = &[];

struct ZeroFields(std::slice::Iter<'static, &'static str>);

impl<'de> MapAccess<'de> for ZeroFields {
    type Error = Error;

    fn next_key_seed<K: DeserializeSeed<'de>>(&mut self, seed: K) -> Result<Option<K::Value>, Error> {
        match self.0.next() {
            Some(field) => seed.deserialize(BorrowedStrDeserializer::<Error>::new(field)).map(Some),
            None => Ok(None),
        }
    }

    fn next_value_seed<V: DeserializeSeed<'de>>(&mut self, seed: V) -> Result<V::Value, Error> {
        seed.deserialize(Zero)
    }
}
