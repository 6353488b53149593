//! Change notifications pushed by the document store after each commit.
//!
//! Reactions are best-effort: the notifier always receives `204 No Content`
//! once the reaction has run, so it never redelivers because of a failed email
//! or audit write.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::{
    models::{
        change_event::{ChangeNotification, Collection, DocumentChange},
        report::ReportDocument,
        user::UserDocument,
    },
    services::change_reactor::ReactionError,
    state::AppState,
};

pub async fn user_updated(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Json(notification): Json<ChangeNotification<UserDocument>>,
) -> StatusCode {
    let change = DocumentChange::from_notification(Collection::Users, user_id, notification);
    finish("users.updated", state.reactor.on_user_updated(change).await)
}

pub async fn report_created(
    State(state): State<AppState>,
    Path(report_id): Path<String>,
    Json(notification): Json<ChangeNotification<ReportDocument>>,
) -> StatusCode {
    let change = DocumentChange::from_notification(Collection::Reports, report_id, notification);
    finish("reports.created", state.reactor.on_report_created(change).await)
}

pub async fn report_updated(
    State(state): State<AppState>,
    Path(report_id): Path<String>,
    Json(notification): Json<ChangeNotification<ReportDocument>>,
) -> StatusCode {
    let change = DocumentChange::from_notification(Collection::Reports, report_id, notification);
    finish("reports.updated", state.reactor.on_report_updated(change).await)
}

fn finish(trigger: &'static str, result: Result<(), ReactionError>) -> StatusCode {
    if let Err(err) = result {
        tracing::error!(trigger, error = %err, "Change reaction failed");
    }
    StatusCode::NO_CONTENT
}
