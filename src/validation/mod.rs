//! リクエストデータの写像と検証
pub mod failure;
pub mod lenient;
pub mod mapper;

pub use failure::{ValidationFailure, ValidationMultiFailure, Violation};
pub use lenient::{recover, Lenient, MappingError};
pub use mapper::{
    empty_string_as_none, validate_mapping, validate_object, CustomValidation, LenientMapper, Mapper, Mapping,
    RequestValidationMapper, StrictMapper, ValidationResult,
};
