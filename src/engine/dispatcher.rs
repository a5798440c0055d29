//! Sequential, throttled delivery of absentee notifications.
//!
//! Sends go out one at a time with a fixed pause between them; the pause is
//! what keeps us under the mail provider's rate limit, so sends must never
//! be run concurrently. A failing recipient is recorded and the run moves on.

use std::time::Duration;

use chrono::NaiveDate;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::model::notification::{BulkNotificationReport, Message, NotificationResult};
use crate::model::person::Person;
use crate::notify::mailer::Mailer;

pub const DEFAULT_DELAY: Duration = Duration::from_millis(1000);
pub const MISSING_EMAIL: &str = "missing email address";

/// Notify a single person. Never fails; the outcome is in the result.
pub async fn dispatch_one<R, M>(person: &Person, date: NaiveDate, render: R, mailer: &M) -> NotificationResult
where
    R: Fn(&Person, NaiveDate) -> Message,
    M: Mailer + ?Sized,
{
    let Some(email) = person.email_address() else {
        debug!(person_id = person.id, "Skipping notification, no email");
        return NotificationResult::failed(person.id, None, MISSING_EMAIL);
    };

    let message = render(person, date);
    match mailer.send(&message).await {
        Ok(receipt) => NotificationResult::sent(person.id, email, receipt.message_id),
        Err(e) => {
            warn!(person_id = person.id, error = %e, "Notification send failed");
            NotificationResult::failed(person.id, Some(email), e.to_string())
        }
    }
}

/// Notify everyone in `people`, in order, pausing `delay` between recipients.
///
/// Stops before the next recipient once `cancel` fires, including while
/// waiting out the pause. Unattempted recipients are counted in `skipped`.
pub async fn dispatch<R, M>(
    people: &[Person],
    date: NaiveDate,
    render: R,
    mailer: &M,
    delay: Duration,
    cancel: &CancellationToken,
) -> BulkNotificationReport
where
    R: Fn(&Person, NaiveDate) -> Message,
    M: Mailer + ?Sized,
{
    let mut results = Vec::with_capacity(people.len());

    for (idx, person) in people.iter().enumerate() {
        if idx > 0 && !delay.is_zero() {
            // a cancel during the pause ends it early
            cancel
                .run_until_cancelled(actix_web::rt::time::sleep(delay))
                .await;
        }
        if cancel.is_cancelled() {
            warn!(attempted = idx, remaining = people.len() - idx, "Notification run cancelled");
            break;
        }

        results.push(dispatch_one(person, date, &render, mailer).await);
    }

    let skipped = people.len() - results.len();
    let report = BulkNotificationReport::from_results(results, skipped);
    info!(
        %date,
        total = report.total,
        sent = report.sent,
        failed = report.failed,
        skipped = report.skipped,
        "Notification run finished"
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::mailer::{MailError, SendReceipt};
    use async_trait::async_trait;
    use std::collections::HashSet;
    use std::sync::Mutex;
    use std::time::Instant;

    /// Records every send; fails for addresses in `failing`, or for all
    /// when `fail_all` is set.
    #[derive(Default)]
    struct ScriptedMailer {
        failing: HashSet<String>,
        fail_all: bool,
        sent: Mutex<Vec<(String, Instant)>>,
        cancel_after: Option<(usize, CancellationToken)>,
    }

    impl ScriptedMailer {
        fn failing(addresses: &[&str]) -> Self {
            Self {
                failing: addresses.iter().map(|a| a.to_string()).collect(),
                ..Default::default()
            }
        }

        fn sent_to(&self) -> Vec<String> {
            self.sent.lock().unwrap().iter().map(|(to, _)| to.clone()).collect()
        }
    }

    #[async_trait]
    impl Mailer for ScriptedMailer {
        async fn send(&self, message: &Message) -> Result<SendReceipt, MailError> {
            let count = {
                let mut sent = self.sent.lock().unwrap();
                sent.push((message.to.clone(), Instant::now()));
                sent.len()
            };
            if let Some((n, token)) = &self.cancel_after {
                if count >= *n {
                    token.cancel();
                }
            }
            if self.fail_all || self.failing.contains(&message.to) {
                return Err(MailError::Build(format!("rejected {}", message.to)));
            }
            Ok(SendReceipt {
                message_id: Some(format!("<{count}@test>")),
            })
        }
    }

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 5, 4).unwrap()
    }

    fn never() -> CancellationToken {
        CancellationToken::new()
    }

    fn person(id: u64, email: Option<&str>) -> Person {
        Person {
            id,
            name: format!("P{id}"),
            email: email.map(str::to_string),
            department: "Ops".to_string(),
            supervisor: None,
        }
    }

    fn render(person: &Person, date: NaiveDate) -> Message {
        Message {
            to: person.email_address().unwrap_or_default().to_string(),
            subject: format!("{} {date}", person.name),
            text_body: String::new(),
            html_body: String::new(),
        }
    }

    #[actix_web::test]
    async fn mixed_outcomes_keep_order() {
        let people = vec![
            person(1, Some("a@x.com")),
            person(2, None),
            person(3, Some("c@x.com")),
        ];
        let mailer = ScriptedMailer::failing(&["c@x.com"]);

        let report = dispatch(&people, day(), render, &mailer, Duration::ZERO, &never()).await;

        assert_eq!((report.total, report.sent, report.failed), (3, 1, 2));
        assert_eq!(report.skipped, 0);
        let summary: Vec<_> = report
            .results
            .iter()
            .map(|r| (r.person_id, r.success))
            .collect();
        assert_eq!(summary, vec![(1, true), (2, false), (3, false)]);
        assert_eq!(report.results[0].message_id.as_deref(), Some("<1@test>"));
        assert_eq!(report.results[1].error.as_deref(), Some(MISSING_EMAIL));
        assert!(report.results[2].error.as_deref().unwrap().contains("rejected c@x.com"));
        assert_eq!(mailer.sent_to(), vec!["a@x.com", "c@x.com"]);
    }

    #[actix_web::test]
    async fn all_failures_still_report() {
        let people: Vec<_> = (1..=4)
            .map(|id| person(id, Some(&format!("p{id}@x.com"))))
            .collect();
        let mailer = ScriptedMailer {
            fail_all: true,
            ..Default::default()
        };

        let report = dispatch(&people, day(), render, &mailer, Duration::ZERO, &never()).await;

        assert_eq!((report.total, report.sent, report.failed), (4, 0, 4));
        assert_eq!(report.results.len(), 4);
        assert!(report
            .results
            .iter()
            .all(|r| !r.success && r.error.as_deref().is_some_and(|e| !e.is_empty())));
    }

    #[actix_web::test]
    async fn blank_email_never_reaches_mailer() {
        let people = vec![person(1, Some("   ")), person(2, None)];
        let mailer = ScriptedMailer::default();

        let report = dispatch(&people, day(), render, &mailer, Duration::ZERO, &never()).await;

        assert!(mailer.sent_to().is_empty());
        assert_eq!(report.failed, 2);
        assert!(report
            .results
            .iter()
            .all(|r| r.error.as_deref() == Some(MISSING_EMAIL)));
    }

    #[actix_web::test]
    async fn render_called_with_person_and_date() {
        let calls = Mutex::new(Vec::new());
        let people = vec![person(1, Some("a@x.com")), person(2, None), person(3, Some("c@x.com"))];
        let mailer = ScriptedMailer::default();

        dispatch(
            &people,
            day(),
            |p: &Person, d: NaiveDate| {
                calls.lock().unwrap().push((p.id, d));
                render(p, d)
            },
            &mailer,
            Duration::ZERO,
            &never(),
        )
        .await;

        assert_eq!(*calls.lock().unwrap(), vec![(1, day()), (3, day())]);
    }

    #[actix_web::test]
    async fn delay_applies_between_sends_only() {
        let delay = Duration::from_millis(40);
        let people = vec![
            person(1, Some("a@x.com")),
            person(2, Some("b@x.com")),
            person(3, Some("c@x.com")),
        ];
        let mailer = ScriptedMailer::default();

        let started = Instant::now();
        dispatch(&people, day(), render, &mailer, delay, &never()).await;
        let finished = Instant::now();

        let sent = mailer.sent.lock().unwrap();
        assert!(sent[0].1 - started < delay);
        for pair in sent.windows(2) {
            assert!(pair[1].1 - pair[0].1 >= delay);
        }
        assert!(finished - sent[2].1 < delay);
    }

    #[actix_web::test]
    async fn cancellation_stops_before_next_recipient() {
        let token = CancellationToken::new();
        let people: Vec<_> = (1..=5)
            .map(|id| person(id, Some(&format!("p{id}@x.com"))))
            .collect();
        let mailer = ScriptedMailer {
            cancel_after: Some((2, token.clone())),
            ..Default::default()
        };

        let report = dispatch(&people, day(), render, &mailer, Duration::ZERO, &token).await;

        assert_eq!(report.total, 2);
        assert_eq!(report.sent, 2);
        assert_eq!(report.skipped, 3);
        assert_eq!(mailer.sent_to(), vec!["p1@x.com", "p2@x.com"]);
    }

    #[actix_web::test]
    async fn cancel_during_pause_sends_nothing_more() {
        let token = CancellationToken::new();
        let delay = Duration::from_millis(200);
        let people: Vec<_> = (1..=3)
            .map(|id| person(id, Some(&format!("p{id}@x.com"))))
            .collect();
        let mailer = ScriptedMailer::default();

        let canceller = token.clone();
        actix_web::rt::spawn(async move {
            actix_web::rt::time::sleep(Duration::from_millis(100)).await;
            canceller.cancel();
        });

        let started = Instant::now();
        let report = dispatch(&people, day(), render, &mailer, delay, &token).await;

        assert_eq!(mailer.sent_to(), vec!["p1@x.com"]);
        assert_eq!((report.total, report.sent, report.skipped), (1, 1, 2));
        assert!(started.elapsed() < delay, "pause was not cut short");
    }

    #[actix_web::test]
    async fn dispatch_one_success_carries_message_id() {
        let mailer = ScriptedMailer::default();
        let result = dispatch_one(&person(7, Some("g@x.com")), day(), render, &mailer).await;
        assert!(result.success);
        assert_eq!(result.email.as_deref(), Some("g@x.com"));
        assert_eq!(result.message_id.as_deref(), Some("<1@test>"));
    }

    #[actix_web::test]
    async fn empty_list_is_empty_report() {
        let mailer = ScriptedMailer::default();
        let report = dispatch(&[], day(), render, &mailer, DEFAULT_DELAY, &never()).await;
        assert_eq!(report, BulkNotificationReport::default());
    }
}
