//! Email route (`/api/emails`)
//!
//! Authenticated users send a plain-text message to any address. The
//! message is screened for profanity, handed to the configured mailer and
//! recorded in the `emails` collection.

use hyper::body::Incoming;
use hyper::{Method, Request, Response};
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

use crate::db::schemas::{EmailDoc, Metadata};
use crate::routes::views::EmailView;
use crate::routes::{
    created_json, method_not_allowed, not_found_response, parse_json_body, path_segments,
    require_fields, respond, BoxBody, RouteResult,
};
use crate::server::AppState;
use crate::services::{is_profane, OutgoingMail};
use crate::types::ScribeError;

#[derive(Debug, Deserialize)]
pub struct SendEmailRequest {
    #[serde(default)]
    pub to: String,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub message: String,
}

impl SendEmailRequest {
    fn validate(&self) -> Result<(), ScribeError> {
        require_fields(&[
            ("to", self.to.as_str()),
            ("subject", self.subject.as_str()),
            ("message", self.message.as_str()),
        ])?;
        if !self.to.contains('@') {
            return Err(ScribeError::BadRequest(format!(
                "'{}' is not an email address",
                self.to
            )));
        }
        if is_profane(&[self.subject.as_str(), self.message.as_str()]) {
            return Err(ScribeError::BadRequest(
                "Email sent failed because it contains profane words".into(),
            ));
        }
        Ok(())
    }
}

/// POST /api/emails
async fn handle_send(req: Request<Incoming>, state: &AppState) -> RouteResult {
    let sender = state.auth(req.headers()).await?;
    sender.ensure_not_blocked()?;
    let body: SendEmailRequest = parse_json_body(req).await?;
    body.validate()?;

    let mail = OutgoingMail {
        to: body.to.trim().to_string(),
        subject: body.subject,
        body: body.message,
    };
    state.mailer.send(&state.args.mail_from, &mail).await?;

    let mut record = EmailDoc {
        _id: None,
        metadata: Metadata::new(),
        sent_by: sender.id,
        from: sender.user.email.clone(),
        to: mail.to,
        subject: mail.subject,
        message: mail.body,
    };
    let id = state.db.emails.insert_one(record.clone()).await?;
    record._id = Some(id);

    info!("User {} sent mail {} to {}", sender.id, id, record.to);
    created_json(&EmailView::from(&record))
}

/// Handle `/api/emails/*` requests
pub async fn handle_email_request(req: Request<Incoming>, state: Arc<AppState>) -> Response<BoxBody> {
    let path = req.uri().path().to_string();
    let method = req.method().clone();
    let Some(segments) = path_segments(&path, "/api/emails") else {
        return not_found_response(&path);
    };

    let result = match (&method, segments.as_slice()) {
        (&Method::POST, []) => handle_send(req, &state).await,
        (_, []) => return method_not_allowed(),
        _ => return not_found_response(&path),
    };

    respond(result)
}
