use thiserror::Error;

#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("no datetime column in schedule header")]
    MissingDatetimeColumn,
}

#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("no parseable datetime in {value:?}")]
    Datetime { value: String },
    #[error("{field}: could not extract a number from {value:?}")]
    Numeric { field: &'static str, value: String },
}
