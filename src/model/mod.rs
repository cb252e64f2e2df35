pub mod attendance;
pub mod role;
pub mod work_zone;
