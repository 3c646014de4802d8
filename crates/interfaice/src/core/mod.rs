mod descriptor;
mod errors;
pub mod method;
pub mod schema;
pub mod value;

pub use descriptor::{AsyncWrapper, ScalarKind, TypeDescriptor, TypeKind};
pub use errors::{ChatError, DecodeError, ErrorKind, InvokeError, TranscodeError};
pub use method::{MethodDescriptor, MethodSignature, ParameterDescriptor};
pub use schema::{EnumSchema, FieldSchema, ObjectFields, ObjectSchema, Setter};
pub use value::{Describe, Encode, Transcode, Value};
