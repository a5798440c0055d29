use crate::{
    api::{attendance, notifications},
    auth::middleware::auth_middleware,
    config::Config,
};
use actix_governor::{
    Governor, GovernorConfigBuilder, PeerIpKeyExtractor, governor::middleware::NoOpMiddleware,
};
use actix_web::{middleware::from_fn, web};
use std::sync::Arc;

// Helper to build per-route limiter
fn build_limiter(requests_per_min: u32) -> Governor<PeerIpKeyExtractor, NoOpMiddleware> {
    let requests_per_min = requests_per_min.max(1);
    let cfg = GovernorConfigBuilder::default()
        .per_millisecond(60_000 / requests_per_min as u64)
        .burst_size(requests_per_min)
        .key_extractor(PeerIpKeyExtractor)
        .finish()
        .expect("rate limit period and burst are non-zero");
    Governor::new(&cfg)
}

pub fn configure(cfg: &mut web::ServiceConfig, config: Config) {
    let protected_limiter = Arc::new(build_limiter(config.rate_protected_per_min));

    // Protected routes
    cfg.service(
        web::scope(&config.api_prefix)
            .wrap(from_fn(auth_middleware)) // authentication
            .wrap(protected_limiter) // rate limiting
            .configure(|cfg| api_routes(cfg, Some(config.rate_notify_per_min))),
    );
}

/// Everything under the API prefix. Reminder routes get their own limiter
/// when `notify_per_min` is set.
pub fn api_routes(cfg: &mut web::ServiceConfig, notify_per_min: Option<u32>) {
    notification_routes(cfg, notify_per_min);
    attendance_routes(cfg);
}

fn attendance_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/attendance")
            // /attendance?date=
            .service(web::resource("").route(web::get().to(attendance::list_by_date)))
            .service(web::resource("/check-in").route(web::post().to(attendance::check_in)))
            .service(web::resource("/check-out").route(web::post().to(attendance::check_out)))
            .service(web::resource("/today").route(web::get().to(attendance::my_today)))
            .service(web::resource("/status").route(web::put().to(attendance::set_status)))
            .service(
                web::resource("/bulk-present").route(web::post().to(attendance::bulk_present)),
            )
            .service(web::resource("/absentees").route(web::get().to(attendance::absentees)))
            .service(web::resource("/summary").route(web::get().to(attendance::summary)))
            .service(
                web::resource("/validate-location")
                    .route(web::post().to(attendance::validate_location)),
            ),
    );
}

/// Reminder runs hit the mail provider, so they get their own, much
/// tighter limit on top of the API-wide one.
fn notification_routes(cfg: &mut web::ServiceConfig, per_min: Option<u32>) {
    let bulk = web::resource("/absentees")
        .route(web::post().to(notifications::notify_absentees))
        .route(web::delete().to(notifications::cancel_notify_absentees));
    let single = web::resource("/absentees/{person_id}")
        .route(web::post().to(notifications::notify_one));

    let scope = web::scope("/notifications");
    match per_min {
        Some(n) => cfg.service(
            scope
                .wrap(Arc::new(build_limiter(n)))
                .service(bulk)
                .service(single),
        ),
        None => cfg.service(scope.service(bulk).service(single)),
    };
}
