//! APIレスポンス用のデータ転送オブジェクト

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Error;

/// エラー種別
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorType {
    #[serde(rename = "validation_error")]
    Validation,
    #[serde(rename = "database_error")]
    Database,
    #[serde(rename = "internal_error")]
    Internal,
    #[serde(rename = "resource_not_found_error")]
    ResourceNotFound,
    #[serde(rename = "resource_access_error")]
    ResourceAccess,
}

impl ErrorType {
    /// 種別に対応するHTTPステータスコード
    pub fn http_code(&self) -> u16 {
        match self {
            ErrorType::Validation => 400,
            ErrorType::Database => 500,
            ErrorType::Internal => 500,
            ErrorType::ResourceNotFound => 404,
            ErrorType::ResourceAccess => 403,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorType::Validation => "validation_error",
            ErrorType::Database => "database_error",
            ErrorType::Internal => "internal_error",
            ErrorType::ResourceNotFound => "resource_not_found_error",
            ErrorType::ResourceAccess => "resource_access_error",
        }
    }
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map_or(true, str::is_empty)
}

fn is_empty_values(values: &Option<BTreeMap<String, Value>>) -> bool {
    values.as_ref().map_or(true, BTreeMap::is_empty)
}

/// 例外（エラー）の要約
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExceptionSummary {
    pub message: String,
    pub code: u16,
    /// `source()` をたどったエラーメッセージの連鎖
    pub trace: Vec<String>,
    #[serde(default, skip_serializing_if = "is_blank")]
    pub sql: Option<String>,
}

impl ExceptionSummary {
    pub fn new(err: &(dyn std::error::Error + 'static), code: u16) -> Self {
        let mut trace = Vec::new();
        let mut source = err.source();
        while let Some(cause) = source {
            trace.push(cause.to_string());
            source = cause.source();
        }
        Self {
            message: err.to_string(),
            code,
            trace,
            sql: None,
        }
    }

    pub fn from_error(err: &Error) -> Self {
        Self::new(err, err.status_code())
    }

    pub fn with_sql(mut self, sql: impl Into<String>) -> Self {
        self.sql = Some(sql.into());
        self
    }
}

/// エラーレスポンス
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    #[serde(rename = "type")]
    pub error_type: ErrorType,
    pub title: String,
    #[serde(default, skip_serializing_if = "is_blank")]
    pub detail: Option<String>,
    #[serde(default, skip_serializing_if = "is_empty_values")]
    pub values: Option<BTreeMap<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exception: Option<ExceptionSummary>,
}

impl ErrorResponse {
    pub fn new(title: impl Into<String>, error_type: ErrorType) -> Self {
        Self {
            error_type,
            title: title.into(),
            detail: None,
            values: None,
            exception: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn with_values(mut self, values: BTreeMap<String, Value>) -> Self {
        self.values = Some(values);
        self
    }

    pub fn with_exception(mut self, exception: ExceptionSummary) -> Self {
        self.exception = Some(exception);
        self
    }

    /// エラーから作成する
    ///
    /// バリデーションエラーの場合は `values` にフィールドごとのメッセージを入れる。
    pub fn from_error(err: &Error) -> Self {
        let messages = match err {
            Error::Validation(failure) => Some(failure.messages()),
            Error::ValidationMulti(failures) => Some(failures.messages()),
            _ => None,
        };
        let response = Self::new(err.to_string(), err.error_type());
        match messages {
            Some(messages) => response.with_values(
                messages
                    .into_iter()
                    .map(|(field, list)| (field, Value::from(list)))
                    .collect(),
            ),
            None => response,
        }
    }

    pub fn status_code(&self) -> u16 {
        self.error_type.http_code()
    }
}

/// 成功レスポンス
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuccessResponse {
    pub message: String,
    #[serde(default, skip_serializing_if = "is_blank")]
    pub detail: Option<String>,
    #[serde(default, skip_serializing_if = "is_empty_values")]
    pub values: Option<BTreeMap<String, Value>>,
}

impl Default for SuccessResponse {
    fn default() -> Self {
        Self {
            message: "Success".to_string(),
            detail: None,
            values: None,
        }
    }
}

impl SuccessResponse {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn with_values(mut self, values: BTreeMap<String, Value>) -> Self {
        self.values = Some(values);
        self
    }

    pub fn with_value(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.get_or_insert_with(BTreeMap::new).insert(name.into(), value.into());
        self
    }
}
