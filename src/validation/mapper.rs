//! リクエストデータをオブジェクトへ写像し、2段階で検証する

use log::{debug, warn};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{Map, Value};
use validator::Validate;

use super::failure::{ValidationFailure, ValidationMultiFailure, Violation};
use super::lenient::{recover, MappingError};
use crate::error::Error;
use crate::request::Request;

/// JSON値を型付きオブジェクトへ変換する
///
/// 変換できない値があっても処理を止めず、すべての位置を違反として報告する。
pub trait Mapper {
    fn denormalize<T: DeserializeOwned>(&self, data: &Value) -> Mapping<T>;
}

/// 写像の結果
///
/// `object` は写像できなかった位置を既定値で埋めたもの。既定値を作れない型が
/// 残った場合のみ `None` になる。
#[derive(Debug)]
pub struct Mapping<T> {
    pub object: Option<T>,
    pub violations: Vec<Violation>,
}

impl<T> Mapping<T> {
    /// 違反が1件もなければオブジェクトを返す
    pub fn into_result(self) -> Result<T, Error> {
        match (self.object, ValidationFailure::from_violations(self.violations)) {
            (Some(object), None) => Ok(object),
            (_, Some(failure)) => Err(Error::Validation(failure)),
            (None, None) => Err(Error::Validation(ValidationFailure::single(Violation::new(
                "",
                "type",
                "request data could not be mapped",
            )))),
        }
    }
}

/// 型を強制しない既定のマッパー
#[derive(Debug, Clone, Copy, Default)]
pub struct LenientMapper;

impl Mapper for LenientMapper {
    fn denormalize<T: DeserializeOwned>(&self, data: &Value) -> Mapping<T> {
        mapping(data, true)
    }
}

/// `serde_json` の型規則どおりに変換するマッパー
#[derive(Debug, Clone, Copy, Default)]
pub struct StrictMapper;

impl Mapper for StrictMapper {
    fn denormalize<T: DeserializeOwned>(&self, data: &Value) -> Mapping<T> {
        mapping(data, false)
    }
}

// null（ボディなし）は空オブジェクトとして写像する
fn mapping<T: DeserializeOwned>(data: &Value, coerce: bool) -> Mapping<T> {
    let empty = Value::Object(Map::new());
    let data = if data.is_null() { &empty } else { data };
    let (object, errors) = recover::<T>(data, coerce);
    Mapping {
        object,
        violations: errors.iter().map(mapping_violation).collect(),
    }
}

fn mapping_violation(err: &MappingError) -> Violation {
    let field = err.path();
    if err.is_missing() {
        Violation::new(field, "required", format!("{} is required", field))
    } else {
        Violation::new(field, "type", err.to_string())
    }
}

/// 属性ベースの検証を終えた後に実行する独自検証
///
/// 既定では何もしない。オブジェクト全体の整合性チェックが必要な型は上書きする。
pub trait CustomValidation {
    fn validate_custom(&self) -> Result<(), ValidationFailure> {
        Ok(())
    }
}

/// 検証結果（部分的に埋まったオブジェクトは返さない）
#[derive(Debug)]
pub enum ValidationResult<T> {
    Ok(T),
    Failed(ValidationFailure),
    FailedMulti(ValidationMultiFailure),
}

impl<T> ValidationResult<T> {
    pub fn is_ok(&self) -> bool {
        matches!(self, ValidationResult::Ok(_))
    }

    pub fn into_result(self) -> Result<T, Error> {
        match self {
            ValidationResult::Ok(value) => Ok(value),
            ValidationResult::Failed(failure) => Err(Error::Validation(failure)),
            ValidationResult::FailedMulti(failures) => Err(Error::ValidationMulti(failures)),
        }
    }
}

/// 2つの検証パスを両方とも実行する
///
/// 1. `validator` による属性ベースの検証（ネストしたオブジェクトも再帰的に検証）
/// 2. [`CustomValidation::validate_custom`]
pub fn validate_object<T>(object: T) -> ValidationResult<T>
where
    T: Validate + CustomValidation,
{
    run_passes(object, Vec::new())
}

/// 写像の違反を属性ベースの検証パスに含めて、2つのパスを実行する
///
/// 写像できなかったフィールドは既定値で埋まっているため、同じフィールドに対する
/// 属性ベースの違反は報告しない。
pub fn validate_mapping<T>(mapping: Mapping<T>) -> ValidationResult<T>
where
    T: Validate + CustomValidation,
{
    let Mapping { object, violations } = mapping;
    match object {
        Some(object) => run_passes(object, violations),
        None => {
            let failure = match ValidationFailure::from_violations(violations) {
                Some(failure) => failure,
                None => ValidationFailure::single(Violation::new("", "type", "request data could not be mapped")),
            };
            warn!("Request data could not be mapped: {}", failure);
            ValidationResult::Failed(failure)
        }
    }
}

fn run_passes<T>(object: T, mut attribute: Vec<Violation>) -> ValidationResult<T>
where
    T: Validate + CustomValidation,
{
    if let Err(errors) = object.validate() {
        let checked = ValidationFailure::from_validator(&errors);
        let remaining: Vec<Violation> = checked
            .violations()
            .iter()
            .filter(|v| !attribute.iter().any(|m| m.field == v.field))
            .cloned()
            .collect();
        attribute.extend(remaining);
    }
    attribute.sort_by(|a, b| a.field.cmp(&b.field).then_with(|| a.code.cmp(&b.code)));

    let mut failures: Vec<ValidationFailure> = ValidationFailure::from_violations(attribute).into_iter().collect();
    if let Err(failure) = object.validate_custom() {
        failures.push(failure);
    }

    match failures.len() {
        0 => ValidationResult::Ok(object),
        1 => {
            let failure = failures.remove(0);
            warn!("Validation failed: {}", failure);
            ValidationResult::Failed(failure)
        }
        _ => {
            let multi = ValidationMultiFailure::new(failures);
            warn!("{}", multi);
            ValidationResult::FailedMulti(multi)
        }
    }
}

/// リクエストのボディまたはクエリを検証済みオブジェクトへ写像する
pub struct RequestValidationMapper<'r, M: Mapper = LenientMapper> {
    mapper: M,
    request: Option<&'r Request>,
}

impl<'r> Default for RequestValidationMapper<'r, LenientMapper> {
    fn default() -> Self {
        Self::new(LenientMapper)
    }
}

impl<'r, M: Mapper> RequestValidationMapper<'r, M> {
    pub fn new(mapper: M) -> Self {
        Self { mapper, request: None }
    }

    pub fn set_request(&mut self, request: &'r Request) -> &mut Self {
        self.request = Some(request);
        self
    }

    /// 解析済みボディを写像・検証する（失敗は `Error::Validation` / `Error::ValidationMulti`）
    pub fn map_body_to_object<T>(&self) -> Result<T, Error>
    where
        T: DeserializeOwned + Validate + CustomValidation,
    {
        self.map_body_result()?.into_result()
    }

    /// クエリパラメータを写像・検証する
    pub fn map_query_to_object<T>(&self) -> Result<T, Error>
    where
        T: DeserializeOwned + Validate + CustomValidation,
    {
        self.map_query_result()?.into_result()
    }

    pub fn map_body_result<T>(&self) -> Result<ValidationResult<T>, Error>
    where
        T: DeserializeOwned + Validate + CustomValidation,
    {
        let request = self.request()?;
        let data = request.parsed_body().cloned().unwrap_or(Value::Null);
        debug!("Mapping request body to {}", std::any::type_name::<T>());
        self.map_value(&data)
    }

    pub fn map_query_result<T>(&self) -> Result<ValidationResult<T>, Error>
    where
        T: DeserializeOwned + Validate + CustomValidation,
    {
        let request = self.request()?;
        debug!("Mapping query parameters to {}", std::any::type_name::<T>());
        self.map_value(&request.query_params().to_value())
    }

    fn map_value<T>(&self, data: &Value) -> Result<ValidationResult<T>, Error>
    where
        T: DeserializeOwned + Validate + CustomValidation,
    {
        Ok(validate_mapping(self.mapper.denormalize::<T>(data)))
    }

    fn request(&self) -> Result<&'r Request, Error> {
        self.request
            .ok_or_else(|| Error::NotReady("Request is not set - call set_request() before mapping".to_string()))
    }
}

/// 空文字列を `None` として扱う `Option<String>` 用のデシリアライザ
///
/// フォームの未入力欄を `required` 検証に掛けたい場合に `#[serde(deserialize_with)]` で使う。
pub fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.trim().is_empty()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize, Validate)]
    struct Signup {
        #[validate(required)]
        email: Option<String>,
        #[validate(range(min = 18))]
        age: u32,
        #[serde(default)]
        accept_terms: bool,
    }

    impl CustomValidation for Signup {
        fn validate_custom(&self) -> Result<(), ValidationFailure> {
            if self.accept_terms {
                Ok(())
            } else {
                Err(ValidationFailure::single(Violation::new(
                    "accept_terms",
                    "accepted",
                    "terms must be accepted",
                )))
            }
        }
    }

    #[derive(Debug, Deserialize, Validate)]
    struct Plain {
        #[validate(length(min = 1))]
        name: String,
    }

    impl CustomValidation for Plain {}

    #[test]
    fn test_validate_object_runs_both_passes() {
        let ok = Signup {
            email: Some("a@example.com".to_string()),
            age: 20,
            accept_terms: true,
        };
        assert!(validate_object(ok).is_ok());

        let one = Signup {
            email: Some("a@example.com".to_string()),
            age: 20,
            accept_terms: false,
        };
        match validate_object(one) {
            ValidationResult::Failed(f) => assert!(f.has_field("accept_terms")),
            other => panic!("unexpected: {:?}", other),
        }

        let both = Signup {
            email: None,
            age: 20,
            accept_terms: false,
        };
        match validate_object(both) {
            ValidationResult::FailedMulti(multi) => {
                assert_eq!(multi.failures().len(), 2);
                assert!(multi.failures()[0].has_field("email"));
                assert!(multi.failures()[1].has_field("accept_terms"));
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_default_custom_validation_passes() {
        assert!(validate_object(Plain { name: "x".to_string() }).is_ok());
        let err = validate_object(Plain { name: String::new() }).into_result().unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn test_lenient_mapper_coerces_and_reports() {
        let signup: Signup = LenientMapper
            .denormalize(&json!({"email": "a@example.com", "age": "21", "accept_terms": "1"}))
            .into_result()
            .unwrap();
        assert_eq!(signup.age, 21);
        assert!(signup.accept_terms);

        let mapping = LenientMapper.denormalize::<Signup>(&json!({"age": "old"}));
        assert_eq!(mapping.violations.len(), 1);
        assert_eq!(mapping.violations[0].field, "age");
        assert_eq!(mapping.violations[0].code, "type");
        assert_eq!(mapping.object.map(|s| s.age), Some(0));

        let mapping = LenientMapper.denormalize::<Signup>(&Value::Null);
        assert_eq!(mapping.violations, vec![Violation::new("age", "required", "age is required")]);
    }

    #[test]
    fn test_strict_mapper_rejects_strings_for_numbers() {
        let mapping = StrictMapper.denormalize::<Signup>(&json!({"age": "21"}));
        assert_eq!(mapping.violations[0].field, "age");
        assert_eq!(mapping.violations[0].code, "type");

        let signup: Signup = StrictMapper.denormalize(&json!({"age": 21})).into_result().unwrap();
        assert_eq!(signup.age, 21);
    }

    #[derive(Debug, Deserialize, Validate)]
    struct Profile {
        #[validate(length(min = 5))]
        name: String,
        #[validate(range(min = 1))]
        age: i32,
        #[serde(default)]
        tags: Vec<String>,
    }

    impl CustomValidation for Profile {
        fn validate_custom(&self) -> Result<(), ValidationFailure> {
            if self.tags.is_empty() {
                Err(ValidationFailure::single(Violation::new("tags", "not_empty", "at least one tag is required")))
            } else {
                Ok(())
            }
        }
    }

    #[test]
    fn test_every_missing_field_is_reported_with_custom_pass() {
        match validate_mapping(LenientMapper.denormalize::<Profile>(&json!({}))) {
            ValidationResult::FailedMulti(multi) => {
                let attribute = multi.failures()[0].violations();
                assert_eq!(attribute.len(), 2);
                assert_eq!((attribute[0].field.as_str(), attribute[0].code.as_str()), ("age", "required"));
                assert_eq!((attribute[1].field.as_str(), attribute[1].code.as_str()), ("name", "required"));
                assert!(multi.failures()[1].has_field("tags"));
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_type_errors_are_aggregated_with_attribute_violations() {
        match validate_mapping(LenientMapper.denormalize::<Profile>(&json!({"name": "ab", "age": "old"}))) {
            ValidationResult::FailedMulti(multi) => {
                let attribute = multi.failures()[0].violations();
                assert_eq!(attribute.len(), 2);
                assert_eq!((attribute[0].field.as_str(), attribute[0].code.as_str()), ("age", "type"));
                assert_eq!((attribute[1].field.as_str(), attribute[1].code.as_str()), ("name", "length"));
                assert!(multi.failures()[1].has_field("tags"));
            }
            other => panic!("unexpected: {:?}", other),
        }

        let ok = validate_mapping(LenientMapper.denormalize::<Profile>(&json!({"name": "alice", "age": "3", "tags": "a"})));
        assert!(ok.is_ok());
    }

    #[test]
    fn test_nested_violations_carry_their_path() {
        #[derive(Debug, Deserialize, Validate)]
        struct Line {
            sku: String,
            quantity: u32,
        }

        #[derive(Debug, Deserialize, Validate)]
        struct Order {
            lines: Vec<Line>,
        }

        impl CustomValidation for Order {}

        let mapping = LenientMapper.denormalize::<Order>(&json!({"lines": [{"sku": "a", "quantity": 1}, {"quantity": "x"}]}));
        let fields: Vec<(&str, &str)> = mapping
            .violations
            .iter()
            .map(|v| (v.field.as_str(), v.code.as_str()))
            .collect();
        assert_eq!(fields, vec![("lines[1].quantity", "type"), ("lines[1].sku", "required")]);
        assert_eq!(mapping.object.map(|o| o.lines.len()), Some(2));
    }

    #[test]
    fn test_unmappable_enum_fails_without_object() {
        #[derive(Debug, Deserialize, Validate)]
        struct Paint {
            #[allow(dead_code)]
            color: Shade,
        }

        #[derive(Debug, Deserialize)]
        enum Shade {
            Light,
        }

        impl CustomValidation for Paint {}

        match validate_mapping(LenientMapper.denormalize::<Paint>(&json!({}))) {
            ValidationResult::Failed(f) => assert!(f.has_field("color")),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_mapper_without_request_is_not_ready() {
        let mapper = RequestValidationMapper::default();
        let err = mapper.map_body_to_object::<Plain>().unwrap_err();
        assert!(matches!(err, Error::NotReady(_)));
        assert_eq!(
            err.to_string(),
            "Request is not set - call set_request() before mapping"
        );
        assert!(matches!(mapper.map_query_result::<Plain>(), Err(Error::NotReady(_))));
    }

    #[test]
    fn test_empty_string_as_none() {
        #[derive(Deserialize)]
        struct Form {
            #[serde(default, deserialize_with = "empty_string_as_none")]
            nickname: Option<String>,
        }
        let form: Form = serde_json::from_value(json!({"nickname": "  "})).unwrap();
        assert!(form.nickname.is_none());
        let form: Form = serde_json::from_value(json!({"nickname": "neo"})).unwrap();
        assert_eq!(form.nickname.as_deref(), Some("neo"));
    }
}
