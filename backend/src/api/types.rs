//! REST API types for frontend integration.
//!
//! Every state-changing endpoint answers with a full [`SessionView`], so the
//! client can redraw the editor, the preview and the submit button from a
//! single response.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::models::{Feedback, FieldMapping, LogicalField, Record};
use crate::session::{Session, SubmissionReport};

/// Placeholder for an empty preview cell
pub const EMPTY_CELL: &str = "N/A";

/// Shown instead of the preview list when there is no dataset
pub const EMPTY_PREVIEW_MESSAGE: &str = "No users mapped yet. Please upload and map a CSV file.";

/// Snapshot of the session sent to the frontend.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    /// Header choices for the mapping editor
    pub headers: Vec<String>,
    pub row_count: usize,
    pub encoding: Option<String>,
    pub mapping: FieldMapping,
    pub fields: Vec<FieldView>,

    pub editor_open: bool,
    pub import_pending: bool,
    /// Most recent live issue, shown inside the editor
    pub live_message: Option<String>,
    pub can_confirm: bool,

    pub preview: Vec<PreviewCard>,
    pub empty_preview_message: Option<&'static str>,

    pub can_submit: bool,
    pub submit_label: &'static str,
    pub outcome: OutcomeView,
    pub last_submission: Option<SubmissionReport>,

    pub feedback: Option<Feedback>,
}

/// One row of the mapping editor
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldView {
    pub field: LogicalField,
    pub required: bool,
    pub header: Option<String>,
    pub issue: Option<String>,
}

/// One record as displayed in the preview list
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PreviewCard {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
}

impl From<&Record> for PreviewCard {
    fn from(record: &Record) -> Self {
        let show = |field: LogicalField| match record.get(field) {
            "" => EMPTY_CELL.to_string(),
            value => value.to_string(),
        };
        Self {
            name: show(LogicalField::Name),
            email: show(LogicalField::Email),
            phone: show(LogicalField::Phone),
            address: show(LogicalField::Address),
        }
    }
}

/// Submission state
#[derive(Debug, Clone, Serialize)]
pub struct OutcomeView {
    pub state: &'static str,
    pub reason: Option<String>,
}

impl From<&Session> for SessionView {
    fn from(session: &Session) -> Self {
        let mapping = session.mapping().clone();

        let fields = LogicalField::ALL
            .into_iter()
            .map(|field| FieldView {
                field,
                required: field.is_required(),
                header: mapping.get(field).map(str::to_string),
                issue: session
                    .live_issues()
                    .iter()
                    .find(|issue| issue.field == field)
                    .map(ToString::to_string),
            })
            .collect();

        let preview: Vec<PreviewCard> = session.dataset().iter().map(PreviewCard::from).collect();
        let empty_preview_message = preview.is_empty().then_some(EMPTY_PREVIEW_MESSAGE);

        SessionView {
            headers: session.headers().to_vec(),
            row_count: session.table().rows.len(),
            encoding: session.encoding().map(str::to_string),
            mapping,
            fields,
            editor_open: session.editor_open(),
            import_pending: session.import_pending(),
            live_message: session.live_message(),
            can_confirm: session.can_confirm(),
            preview,
            empty_preview_message,
            can_submit: session.can_submit(),
            submit_label: session.submit_label(),
            outcome: OutcomeView {
                state: session.outcome().label(),
                reason: session.outcome().reason(),
            },
            last_submission: session.last_submission().cloned(),
            feedback: session.feedback().cloned(),
        }
    }
}

/// Body of `PUT /api/mapping/{field}`
#[derive(Debug, Clone, Deserialize)]
pub struct MappingRequest {
    /// Source header, empty to unmap
    #[serde(default)]
    pub header: String,
}

/// Create an error response
pub fn error_response(error: &str) -> Value {
    json!({
        "requestId": Uuid::new_v4().to_string(),
        "status": "error",
        "error": error,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session_with_dataset() -> Session {
        let mut session = Session::new();
        session
            .load_text("name,email,phone\nAda,ada@x.com,\nBob,bob@x.com,555", None)
            .unwrap();
        session.set_mapping(LogicalField::Name, "name").unwrap();
        session.set_mapping(LogicalField::Email, "email").unwrap();
        session.confirm_mapping().unwrap();
        session
    }

    #[test]
    fn test_empty_session_view() {
        let view = SessionView::from(&Session::new());
        assert!(view.preview.is_empty());
        assert_eq!(view.empty_preview_message, Some(EMPTY_PREVIEW_MESSAGE));
        assert!(!view.can_submit);
        assert_eq!(view.submit_label, "Submit to API");
        assert_eq!(view.outcome.state, "idle");
    }

    #[test]
    fn test_preview_uses_placeholder() {
        let view = SessionView::from(&session_with_dataset());

        assert_eq!(view.empty_preview_message, None);
        assert_eq!(view.preview.len(), 2);
        assert_eq!(view.preview[0].name, "Ada");
        assert_eq!(view.preview[0].phone, EMPTY_CELL);
        assert_eq!(view.preview[1].address, EMPTY_CELL);
        assert!(view.can_submit);
    }

    #[test]
    fn test_field_views_carry_issues() {
        let mut session = Session::new();
        session.load_text("name,email\nAda,broken", None).unwrap();
        session.set_mapping(LogicalField::Email, "email").unwrap();

        let view = SessionView::from(&session);
        let email = &view.fields[1];
        assert_eq!(email.field, LogicalField::Email);
        assert!(email.required);
        assert_eq!(email.header.as_deref(), Some("email"));
        assert!(email.issue.as_deref().unwrap().contains("invalid email"));
        assert!(view.fields[0].issue.is_none());
        assert!(!view.can_confirm);
    }

    #[test]
    fn test_view_serializes_camel_case() {
        let json = serde_json::to_value(SessionView::from(&session_with_dataset())).unwrap();
        assert_eq!(json["rowCount"], 2);
        assert_eq!(json["canSubmit"], true);
        assert_eq!(json["mapping"]["email"], "email");
        assert_eq!(json["fields"][0]["field"], "name");
        assert!(json["feedback"].is_null());
    }

    #[test]
    fn test_error_response() {
        let json = error_response("bad input");
        assert_eq!(json["status"], "error");
        assert_eq!(json["error"], "bad input");
        assert!(json["requestId"].is_string());
    }
}
