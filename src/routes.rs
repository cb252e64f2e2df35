use crate::{
    api::{attendance, work_zone},
    auth::{handlers, middleware::auth_middleware},
    config::Config,
};
use actix_governor::{
    Governor, GovernorConfigBuilder, PeerIpKeyExtractor, governor::middleware::NoOpMiddleware,
};
use actix_web::{guard, middleware::from_fn, web};
use std::sync::Arc;

// Per-route limiter; a zero rate is treated as one request per minute
fn build_limiter(requests_per_min: u32) -> Governor<PeerIpKeyExtractor, NoOpMiddleware> {
    let requests_per_min = requests_per_min.max(1);
    let cfg = GovernorConfigBuilder::default()
        .per_millisecond(60_000 / requests_per_min as u64)
        .burst_size(requests_per_min)
        .key_extractor(PeerIpKeyExtractor)
        .finish()
        .expect("rate limiter period and burst are non-zero");
    Governor::new(&cfg)
}

pub fn configure(cfg: &mut web::ServiceConfig, config: Config) {
    let login_limiter = Arc::new(build_limiter(config.rate_login_per_min));
    let refresh_limiter = Arc::new(build_limiter(config.rate_refresh_per_min));
    let check_limiter = Arc::new(build_limiter(config.rate_check_per_min));
    let protected_limiter = Arc::new(build_limiter(config.rate_protected_per_min));

    // Public routes
    cfg.service(
        web::scope("/auth")
            .service(
                web::resource("/login")
                    .wrap(login_limiter.clone())
                    .route(web::post().to(handlers::login)),
            )
            .service(
                web::resource("/refresh")
                    .wrap(refresh_limiter)
                    .route(web::post().to(handlers::refresh_token)),
            )
            .service(
                web::resource("/logout")
                    .wrap(login_limiter)
                    .route(web::post().to(handlers::logout)),
            ),
    );

    // Protected routes
    cfg.service(
        web::scope(&config.api_prefix)
            .wrap(from_fn(auth_middleware))
            .wrap(protected_limiter)
            .service(
                web::scope("/attendance")
                    // POST /attendance, rate limited per client
                    .service(
                        web::resource("")
                            .guard(guard::Post())
                            .wrap(check_limiter)
                            .route(web::post().to(attendance::create_record)),
                    )
                    // GET /attendance
                    .service(web::resource("").route(web::get().to(attendance::list_records)))
                    // /attendance/today
                    .service(web::resource("/today").route(web::get().to(attendance::today)))
                    // /attendance/daily
                    .service(web::resource("/daily").route(web::get().to(attendance::daily))),
            )
            .service(
                web::scope("/zones")
                    // /zones
                    .service(
                        web::resource("")
                            .route(web::get().to(work_zone::list_zones))
                            .route(web::post().to(work_zone::create_zone)),
                    )
                    // /zones/{id}
                    .service(
                        web::resource("/{id}")
                            .route(web::get().to(work_zone::get_zone))
                            .route(web::put().to(work_zone::update_zone))
                            .route(web::delete().to(work_zone::delete_zone)),
                    ),
            ),
    );
}

// LOGIN
//  ├─ access_token (15 min)
//  └─ refresh_token (7 days)

// CHECK
//  └─ POST {api}/attendance  Authorization: Bearer access_token
//       ├─ 201 record
//       └─ 400 / 409 { code, message, recovery }

// ACCESS EXPIRED
//  └─ POST /auth/refresh with refresh_token
//       └─ returns a new pair, old refresh token revoked
