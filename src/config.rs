use chrono::FixedOffset;
use dotenvy::dotenv;
use std::env;

#[derive(Clone)]
pub struct Config {
    pub database_url: String,
    pub db_max_connections: u32,
    pub jwt_secret: String,
    pub server_addr: String,
    pub access_token_ttl: usize,
    pub refresh_token_ttl: usize,

    // Rate limiting
    pub rate_login_per_min: u32,
    pub rate_refresh_per_min: u32,
    pub rate_check_per_min: u32,
    pub rate_protected_per_min: u32,

    pub api_prefix: String,

    /// Seconds a zone snapshot may be served from cache
    pub zone_cache_ttl_secs: u64,
    /// Offset of the local calendar day used for attendance
    pub day_utc_offset_secs: i32,
}

fn var_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(v) => v
            .parse()
            .unwrap_or_else(|_| panic!("{key} must be a valid number")),
        Err(_) => default,
    }
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        Self {
            server_addr: env::var("SERVER_ADDR").expect("SERVER_ADDR must be set"),
            database_url: env::var("DATABASE_URL").expect("DATABASE_URL must be set"),
            db_max_connections: var_or("DB_MAX_CONNECTIONS", 10),
            jwt_secret: env::var("JWT_SECRET").expect("JWT_SECRET must be set"),
            access_token_ttl: var_or("ACCESS_TOKEN_TTL", 900), // 15 min
            refresh_token_ttl: var_or("REFRESH_TOKEN_TTL", 604_800), // 7 days

            rate_login_per_min: var_or("RATE_LOGIN_PER_MIN", 60),
            rate_refresh_per_min: var_or("RATE_REFRESH_PER_MIN", 30),
            rate_check_per_min: var_or("RATE_CHECK_PER_MIN", 20),
            rate_protected_per_min: var_or("RATE_PROTECTED_PER_MIN", 1000),

            api_prefix: env::var("API_PREFIX").unwrap_or_else(|_| "/api".to_string()),

            zone_cache_ttl_secs: var_or("ZONE_CACHE_TTL_SECS", 300),
            day_utc_offset_secs: var_or("DAY_UTC_OFFSET_SECS", 0),
        }
    }

    /// Offset of the attendance calendar day; out-of-range values fall back to UTC.
    pub fn day_offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.day_utc_offset_secs)
            .unwrap_or_else(|| FixedOffset::east_opt(0).expect("zero offset is valid"))
    }
}
