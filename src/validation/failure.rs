//! バリデーション失敗の表現

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use thiserror::Error;
use validator::{ValidationErrors, ValidationErrorsKind};

/// 単一フィールドの違反
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Violation {
    /// フィールドパス（ネストは `address.street`、配列は `items[0].name`）
    pub field: String,
    /// 失敗した制約（`required`・`length`・`range`・`type` 等）
    pub code: String,
    pub message: String,
}

impl Violation {
    pub fn new(field: impl Into<String>, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            code: code.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.field.is_empty() {
            write!(f, "{}", self.message)
        } else {
            write!(f, "{}: {}", self.field, self.message)
        }
    }
}

/// 1回のバリデーションパスの失敗（違反は1件以上）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Error)]
#[error("Validation failed: {}", join_violations(&.violations))]
pub struct ValidationFailure {
    violations: Vec<Violation>,
}

fn join_violations(violations: &[Violation]) -> String {
    violations.iter().map(Violation::to_string).collect::<Vec<_>>().join("; ")
}

impl ValidationFailure {
    pub fn single(violation: Violation) -> Self {
        Self {
            violations: vec![violation],
        }
    }

    /// 違反リストから作成（空ならNone）
    pub fn from_violations(violations: Vec<Violation>) -> Option<Self> {
        if violations.is_empty() {
            None
        } else {
            Some(Self { violations })
        }
    }

    /// `validator` のエラーを平坦化して作成（フィールドパス順に整列）
    pub fn from_validator(errors: &ValidationErrors) -> Self {
        let mut violations = Vec::new();
        flatten(errors, "", &mut violations);
        violations.sort_by(|a, b| a.field.cmp(&b.field).then_with(|| a.code.cmp(&b.code)));
        Self { violations }
    }

    pub fn add(mut self, violation: Violation) -> Self {
        self.violations.push(violation);
        self
    }

    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    /// フィールドごとのメッセージ一覧
    pub fn messages(&self) -> BTreeMap<String, Vec<String>> {
        let mut out: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for v in &self.violations {
            out.entry(v.field.clone()).or_default().push(v.message.clone());
        }
        out
    }

    pub fn has_field(&self, field: &str) -> bool {
        self.violations.iter().any(|v| v.field == field)
    }
}

fn flatten(errors: &ValidationErrors, prefix: &str, out: &mut Vec<Violation>) {
    for (field, kind) in errors.errors() {
        let path = if prefix.is_empty() {
            field.to_string()
        } else {
            format!("{}.{}", prefix, field)
        };
        match kind {
            ValidationErrorsKind::Field(field_errors) => {
                for err in field_errors {
                    let message = err
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| default_message(&path, err));
                    out.push(Violation::new(path.clone(), err.code.to_string(), message));
                }
            }
            ValidationErrorsKind::Struct(nested) => flatten(nested, &path, out),
            ValidationErrorsKind::List(items) => {
                for (index, nested) in items {
                    flatten(nested, &format!("{}[{}]", path, index), out);
                }
            }
        }
    }
}

fn default_message(field: &str, err: &validator::ValidationError) -> String {
    let param = |name: &str| err.params.get(name).map(|v| v.to_string());
    match err.code.as_ref() {
        "required" => format!("{} is required", field),
        "length" => match (param("min"), param("max")) {
            (Some(min), Some(max)) => format!("{} must be between {} and {} characters long", field, min, max),
            (Some(min), None) => format!("{} must be at least {} characters long", field, min),
            (None, Some(max)) => format!("{} must be at most {} characters long", field, max),
            _ => format!("{} has an invalid length", field),
        },
        "range" => match (param("min"), param("max")) {
            (Some(min), Some(max)) => format!("{} must be between {} and {}", field, min, max),
            (Some(min), None) => format!("{} must be at least {}", field, min),
            (None, Some(max)) => format!("{} must be at most {}", field, max),
            _ => format!("{} is out of range", field),
        },
        "email" => format!("{} must be a valid email address", field),
        "url" => format!("{} must be a valid URL", field),
        code => format!("{} failed the {} check", field, code),
    }
}

/// 複数パスの失敗（各パスの失敗を個別に保持する）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Error)]
#[error("{} validation passes failed: {}", .failures.len(), join_failures(&.failures))]
pub struct ValidationMultiFailure {
    failures: Vec<ValidationFailure>,
}

fn join_failures(failures: &[ValidationFailure]) -> String {
    failures
        .iter()
        .map(|f| join_violations(f.violations()))
        .collect::<Vec<_>>()
        .join(" | ")
}

impl ValidationMultiFailure {
    pub fn new(failures: Vec<ValidationFailure>) -> Self {
        Self { failures }
    }

    pub fn failures(&self) -> &[ValidationFailure] {
        &self.failures
    }

    /// 全パスの違反を連結
    pub fn violations(&self) -> impl Iterator<Item = &Violation> {
        self.failures.iter().flat_map(|f| f.violations.iter())
    }

    /// フィールドごとのメッセージ一覧（全パス分）
    pub fn messages(&self) -> BTreeMap<String, Vec<String>> {
        let mut out: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for v in self.violations() {
            out.entry(v.field.clone()).or_default().push(v.message.clone());
        }
        out
    }
}
