pub mod aid_request;
pub mod case;
pub mod config;
pub mod error;
pub mod incident;
pub mod storage;
pub mod user;

pub use aid_request::*;
pub use case::*;
pub use config::*;
pub use error::*;
pub use incident::*;
pub use storage::*;
pub use user::*;
