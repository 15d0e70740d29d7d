use thiserror::Error;

#[derive(Debug, Error)]
pub enum CompareError {
    #[error("identity key {key:?} not found in {side:?} dataset")]
    MissingIdentityKey { side: &'static str, key: String },
}

pub type Result<T> = std::result::Result<T, CompareError>;
