use crate::api::attendance::load_day;
use crate::auth::auth::AuthUser;
use crate::engine::{
    absentee::find_absentees,
    dispatcher::{dispatch, dispatch_one},
};
use crate::model::notification::{BulkNotificationReport, NotificationResult};
use crate::notify::template::render_absentee_reminder;
use crate::state::{AppState, today};
use actix_web::{HttpResponse, Responder, web};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument};
use utoipa::ToSchema;

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct NotifyAbsenteesRequest {
    /// Day to notify about, defaults to today
    #[schema(example = "2026-01-05", format = "date", value_type = Option<String>)]
    pub date: Option<NaiveDate>,
    /// Pause between sends, defaults to NOTIFY_DELAY_MS
    #[schema(example = 1000)]
    pub delay_ms: Option<u64>,
}

/// Clears the in-flight run marker when the run ends, even on panic.
struct ActiveRun<'a> {
    state: &'a AppState,
}

impl<'a> ActiveRun<'a> {
    /// `None` if another run is already going.
    fn start(state: &'a AppState, token: CancellationToken) -> Option<Self> {
        let mut slot = state.active_run.lock().ok()?;
        if slot.is_some() {
            return None;
        }
        *slot = Some(token);
        Some(Self { state })
    }
}

impl Drop for ActiveRun<'_> {
    fn drop(&mut self) {
        if let Ok(mut slot) = self.state.active_run.lock() {
            *slot = None;
        }
    }
}

/// Email every absentee for a day, one at a time
#[utoipa::path(
    post,
    path = "/api/notifications/absentees",
    request_body = NotifyAbsenteesRequest,
    responses(
        (status = 200, description = "Run finished, per-recipient results", body = BulkNotificationReport),
        (status = 403, description = "HR/Admin only"),
        (status = 409, description = "Another reminder run is in progress", body = Object, example = json!({
            "message": "A reminder run is already in progress"
        }))
    ),
    security(("bearer_auth" = [])),
    tag = "Notifications"
)]
#[instrument(
    name = "notify_absentees",
    skip(auth, state, body),
    fields(user_id = auth.user_id, username = %auth.username)
)]
pub async fn notify_absentees(
    auth: AuthUser,
    state: web::Data<AppState>,
    body: Option<web::Json<NotifyAbsenteesRequest>>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;
    let body = body.map(|b| b.into_inner()).unwrap_or_default();
    let date = body.date.unwrap_or_else(today);
    let delay = body
        .delay_ms
        .map(Duration::from_millis)
        .unwrap_or(state.notify_delay);

    let (roster, records) = load_day(&state, date).await?;
    let absentees = find_absentees(date, &roster, &records);
    info!(%date, absentees = absentees.len(), "Starting absentee reminder run");

    let token = CancellationToken::new();
    let run_state = state.into_inner();

    // The run lives on its own task so a dropped client connection doesn't
    // abandon it halfway through the list.
    let handle = actix_web::rt::spawn(async move {
        let Some(_active) = ActiveRun::start(&run_state, token.clone()) else {
            return None;
        };
        Some(
            dispatch(
                &absentees,
                date,
                render_absentee_reminder,
                run_state.mailer.as_ref(),
                delay,
                &token,
            )
            .await,
        )
    });

    match handle.await {
        Ok(Some(report)) => Ok(HttpResponse::Ok().json(report)),
        Ok(None) => Ok(HttpResponse::Conflict().json(json!({
            "message": "A reminder run is already in progress"
        }))),
        Err(e) => {
            error!(error = %e, "Reminder run task failed");
            Err(actix_web::error::ErrorInternalServerError(
                "Internal Server Error",
            ))
        }
    }
}

/// Stop the reminder run in progress after its current recipient
#[utoipa::path(
    delete,
    path = "/api/notifications/absentees",
    responses(
        (status = 200, description = "Cancellation requested", body = Object, example = json!({
            "message": "Reminder run cancelled"
        })),
        (status = 404, description = "No run in progress")
    ),
    security(("bearer_auth" = [])),
    tag = "Notifications"
)]
pub async fn cancel_notify_absentees(
    auth: AuthUser,
    state: web::Data<AppState>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;

    let token = state
        .active_run
        .lock()
        .map_err(|_| actix_web::error::ErrorInternalServerError("Internal Server Error"))?
        .clone();

    match token {
        Some(t) => {
            t.cancel();
            info!(user_id = auth.user_id, "Reminder run cancellation requested");
            Ok(HttpResponse::Ok().json(json!({ "message": "Reminder run cancelled" })))
        }
        None => Ok(HttpResponse::NotFound().json(json!({
            "message": "No reminder run in progress"
        }))),
    }
}

/// Email one person about a day
#[utoipa::path(
    post,
    path = "/api/notifications/absentees/{person_id}",
    params(
        ("person_id", description = "Roster id"),
        ("date" = Option<String>, Query, description = "Day to notify about, defaults to today")
    ),
    responses(
        (status = 200, body = NotificationResult),
        (status = 404, description = "Person not on the active roster")
    ),
    security(("bearer_auth" = [])),
    tag = "Notifications"
)]
pub async fn notify_one(
    auth: AuthUser,
    state: web::Data<AppState>,
    path: web::Path<u64>,
    query: web::Query<crate::api::attendance::DateQuery>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;
    let person_id = path.into_inner();
    let date = query.date.unwrap_or_else(today);

    let roster = state.roster.list_active_people().await.map_err(|e| {
        error!(error = %e, "Failed to load roster");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    let Some(person) = roster.into_iter().find(|p| p.id == person_id) else {
        return Ok(HttpResponse::NotFound().json(json!({
            "message": "Person not found"
        })));
    };

    let result =
        dispatch_one(&person, date, render_absentee_reminder, state.mailer.as_ref()).await;
    Ok(HttpResponse::Ok().json(result))
}

#[cfg(test)]
mod tests {
    use crate::api::test_support::{app_state_with_mailer, bearer, test_app};
    use crate::model::notification::Message;
    use crate::notify::mailer::{MailError, Mailer, SendReceipt};
    use actix_web::{http::StatusCode, test};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Arc;

    /// Fails for c@x.com, accepts everyone else.
    struct PickyMailer;

    #[async_trait]
    impl Mailer for PickyMailer {
        async fn send(&self, message: &Message) -> Result<SendReceipt, MailError> {
            if message.to == "c@x.com" {
                return Err(MailError::Build("mailbox full".to_string()));
            }
            Ok(SendReceipt {
                message_id: Some(format!("<{}>", message.to)),
            })
        }
    }

    #[actix_web::test]
    async fn bulk_run_reports_every_absentee() {
        let state = app_state_with_mailer(vec![], Arc::new(PickyMailer));
        let app = test::init_service(test_app(state.clone())).await;

        let req = test::TestRequest::post()
            .uri("/api/notifications/absentees")
            .insert_header(bearer(1, None))
            .set_json(json!({"date": "2026-01-05", "delay_ms": 0}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let report: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(report["total"], 3);
        assert_eq!(report["sent"], 1);
        assert_eq!(report["failed"], 2);
        assert_eq!(report["results"][0]["success"], true);
        assert_eq!(report["results"][1]["error"], "missing email address");
        assert_eq!(report["results"][2]["error"], "Email build error: mailbox full");
        assert!(state.active_run.lock().unwrap().is_none());
    }

    #[actix_web::test]
    async fn bulk_run_conflicts_with_active_run() {
        let state = app_state_with_mailer(vec![], Arc::new(PickyMailer));
        *state.active_run.lock().unwrap() = Some(Default::default());
        let app = test::init_service(test_app(state.clone())).await;

        let req = test::TestRequest::post()
            .uri("/api/notifications/absentees")
            .insert_header(bearer(1, None))
            .set_json(json!({"delay_ms": 0}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CONFLICT);
        assert!(state.active_run.lock().unwrap().is_some());
    }

    #[actix_web::test]
    async fn cancel_without_run_is_not_found() {
        let app = test::init_service(test_app(app_state_with_mailer(vec![], Arc::new(PickyMailer))))
            .await;
        let req = test::TestRequest::delete()
            .uri("/api/notifications/absentees")
            .insert_header(bearer(2, None))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn single_notification_for_unknown_person_is_not_found() {
        let app = test::init_service(test_app(app_state_with_mailer(vec![], Arc::new(PickyMailer))))
            .await;
        let req = test::TestRequest::post()
            .uri("/api/notifications/absentees/42")
            .insert_header(bearer(1, None))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn single_notification_without_email_fails_softly() {
        let app = test::init_service(test_app(app_state_with_mailer(vec![], Arc::new(PickyMailer))))
            .await;
        let req = test::TestRequest::post()
            .uri("/api/notifications/absentees/2?date=2026-01-05")
            .insert_header(bearer(1, None))
            .to_request();
        let result: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(result["success"], false);
        assert_eq!(result["error"], "missing email address");
    }

    #[actix_web::test]
    async fn interns_cannot_send_reminders() {
        let app = test::init_service(test_app(app_state_with_mailer(vec![], Arc::new(PickyMailer))))
            .await;
        let req = test::TestRequest::post()
            .uri("/api/notifications/absentees")
            .insert_header(bearer(3, Some(1)))
            .set_json(json!({}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    }
}
