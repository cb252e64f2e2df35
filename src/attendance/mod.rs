//! Attendance day state, the check authorization gate and the client
//! session built on top of them.

pub mod authorize;
pub mod position;
pub mod report;
pub mod session;
pub mod state;

pub use authorize::{Authorization, Denial, Recovery, authorize_check};
pub use position::{LatestPosition, PositionProvider, PositionReading, TieredPositionSource};
pub use session::{AttendanceBackend, CheckSession, ClockStatus, SessionConfig, SessionError};
pub use state::{DayState, derive_day_state};
