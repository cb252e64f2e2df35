//! Client side of the attendance contract.

mod config;
mod error;
mod http;

pub use config::ClientConfig;
pub use error::{ClientError, ClientResult, RejectionBody};
pub use http::HttpAttendanceBackend;
