pub mod db_utils;
pub mod zone_cache;
