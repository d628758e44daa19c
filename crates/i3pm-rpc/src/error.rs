pub type Result<T> = std::result::Result<T, ClientError>;

pub use crate::client::ClientError;
