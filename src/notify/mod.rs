pub mod mailer;
pub mod template;
