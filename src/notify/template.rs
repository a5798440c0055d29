use chrono::NaiveDate;

use crate::model::{notification::Message, person::Person};

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Reminder sent to someone with no attendance for `date`.
///
/// The caller guarantees `person` has an email address; a missing one
/// renders an empty `to`.
pub fn render_absentee_reminder(person: &Person, date: NaiveDate) -> Message {
    let day = date.format("%A, %B %-d, %Y").to_string();
    let to = person.email_address().unwrap_or_default().to_string();

    let text_body = format!(
        "Hi {name},\n\n\
         We have no attendance recorded for you on {day}.\n\
         If you are working today, please check in. If you are away, \
         let your supervisor know so the day can be marked correctly.\n",
        name = person.name,
    );

    let supervisor = person
        .supervisor
        .as_deref()
        .map(|s| format!("<p>Supervisor: {}</p>", escape_html(s)))
        .unwrap_or_default();

    let html_body = format!(
        "<html><body>\
         <p>Hi {name},</p>\
         <p>We have no attendance recorded for you on <strong>{day}</strong>.</p>\
         <p>If you are working today, please check in. If you are away, \
         let your supervisor know so the day can be marked correctly.</p>\
         {supervisor}\
         </body></html>",
        name = escape_html(&person.name),
    );

    Message {
        to,
        subject: format!("Attendance reminder for {day}"),
        text_body,
        html_body,
    }
}
