pub mod error;
pub mod types;
pub mod value;

pub use error::{PureError, Result};
pub use types::{Column, DataType, OneOrMany, Related};
pub use value::Value;
