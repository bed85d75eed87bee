pub mod decode;
pub mod error;
pub mod schema;
pub mod timeparse;
pub mod types;

pub use decode::Cell;
pub use error::{DecodeError, SchemaError};
pub use schema::FieldIndices;
pub use timeparse::TimeContext;
pub use types::{TimePoint, NULL_TARGET_F64, NULL_TARGET_INT};
