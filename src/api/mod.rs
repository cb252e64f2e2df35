pub mod attendance;
pub mod work_zone;
