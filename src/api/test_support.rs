//! Shared fixtures for handler tests.

use std::sync::Arc;
use std::time::Duration;

use actix_web::{
    App, Error,
    body::MessageBody,
    dev::{ServiceFactory, ServiceRequest, ServiceResponse},
    http::header,
    middleware::from_fn,
    web,
};
use chrono::NaiveTime;
use jsonwebtoken::{EncodingKey, Header, encode};

use crate::auth::middleware::auth_middleware;
use crate::config::Config;
use crate::engine::lateness::LatePolicy;
use crate::model::{geofence::Geofence, person::Person};
use crate::models::Claims;
use crate::notify::mailer::{DisabledMailer, Mailer};
use crate::routes;
use crate::state::AppState;
use crate::store::memory::{MemoryRecordStore, StaticGeofences, StaticRoster};

const SECRET: &str = "test-secret";

pub fn test_config() -> Config {
    Config {
        database_url: "mysql://unused".to_string(),
        jwt_secret: SECRET.to_string(),
        server_addr: "127.0.0.1:0".to_string(),
        rate_protected_per_min: 1000,
        rate_notify_per_min: 6,
        api_prefix: "/api".to_string(),
        work_start_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
        late_grace_minutes: 15,
        geofence_cache_ttl_secs: 60,
        notify_delay_ms: 0,
        smtp: None,
    }
}

/// Roster: 1 (a@x.com), 2 (no email), 3 (c@x.com).
pub fn roster() -> Vec<Person> {
    [(1, Some("a@x.com")), (2, None), (3, Some("c@x.com"))]
        .into_iter()
        .map(|(id, email)| Person {
            id,
            name: format!("Intern {id}"),
            email: email.map(str::to_string),
            department: "Engineering".to_string(),
            supervisor: None,
        })
        .collect()
}

pub fn app_state_with_mailer(
    fences: Vec<Geofence>,
    mailer: Arc<dyn Mailer>,
) -> web::Data<AppState> {
    web::Data::new(AppState::new(
        Arc::new(MemoryRecordStore::new()),
        Arc::new(StaticRoster(roster())),
        Arc::new(StaticGeofences(fences)),
        mailer,
        // never late, so tests don't depend on the wall clock
        LatePolicy::new(NaiveTime::from_hms_opt(23, 59, 59).unwrap(), 0),
        Duration::ZERO,
    ))
}

pub fn app_state(fences: Vec<Geofence>) -> web::Data<AppState> {
    app_state_with_mailer(fences, Arc::new(DisabledMailer))
}

pub fn bearer(role: u8, person_id: Option<u64>) -> (header::HeaderName, String) {
    let claims = Claims {
        user_id: 100,
        sub: "tester".to_string(),
        role,
        exp: (chrono::Utc::now().timestamp() + 600) as usize,
        person_id,
    };
    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(SECRET.as_bytes()),
    )
    .unwrap();
    (header::AUTHORIZATION, format!("Bearer {token}"))
}

/// The protected API scope without rate limiting.
pub fn test_app(
    state: web::Data<AppState>,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse<impl MessageBody>,
        Error = Error,
        InitError = (),
    >,
> {
    App::new()
        .app_data(web::Data::new(test_config()))
        .app_data(state)
        .service(
            web::scope("/api")
                .wrap(from_fn(auth_middleware))
                .configure(|cfg| routes::api_routes(cfg, None)),
        )
}
