//! Interactive import session.
//!
//! [`Session`] owns every piece of mutable state of an import: the table,
//! the mapping, the live issues, the committed dataset, the submission
//! outcome and the feedback line. All changes go through its transition
//! methods; nothing else mutates that state.
//!
//! Both suspension points (reading a file, sending the dataset) are split
//! into a `begin_*` / `finish_*` pair so that a caller holding the session
//! behind a lock can release it while the I/O runs. While an operation is
//! pending, its `begin_*` refuses to start a second one.
//!
//! ```text
//! import ──▶ editor open ──set_mapping*──▶ confirm ──▶ dataset ──▶ submit
//!              │    ▲                         │                    │
//!              │    └──── cancel / reject ────┘              in-flight ─▶ succeeded | failed
//! ```

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::Path;
use uuid::Uuid;

use crate::api::logs::{log_error, log_info, log_success, log_warning};
use crate::error::{ImportError, ImportResult, MappingResult, SubmitError, ValidationError};
use crate::mapping::FieldMapper;
use crate::models::{Dataset, Feedback, FieldMapping, LogicalField, RawTable, SubmissionOutcome};
use crate::parser::{decode_bytes, read_file, tokenize, DecodedText};
use crate::submit::Submitter;
use crate::transform::project;
use crate::validation::{check_column, validate, LiveIssue};

pub const SUBMIT_LABEL: &str = "Submit to API";
pub const SUBMITTING_LABEL: &str = "Submitting...";
pub const NO_DATA_MESSAGE: &str = "No data to submit. Please map a CSV file first.";
pub const SUBMIT_SUCCESS_MESSAGE: &str = "Data submitted successfully!";

/// A submission that has been started and not yet finished.
#[derive(Debug, Clone)]
pub struct SubmitTicket {
    pub id: Uuid,
    pub dataset: Dataset,
    pub started_at: DateTime<Utc>,
}

/// Summary of the last finished submission.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionReport {
    pub id: Uuid,
    pub record_count: usize,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub state: &'static str,
    pub reason: Option<String>,
}

/// Coordinating state for one user's import
#[derive(Debug, Default)]
pub struct Session {
    table: RawTable,
    encoding: Option<String>,
    mapper: FieldMapper,
    /// At most one issue per field, oldest first.
    live_issues: Vec<LiveIssue>,
    dataset: Dataset,
    outcome: SubmissionOutcome,
    feedback: Option<Feedback>,
    editor_open: bool,
    import_pending: bool,
    active_submission: Option<Uuid>,
    last_submission: Option<SubmissionReport>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn table(&self) -> &RawTable {
        &self.table
    }

    /// Encoding detected for the current table, if it came from bytes.
    pub fn encoding(&self) -> Option<&str> {
        self.encoding.as_deref()
    }

    /// Header choices for the mapping editor.
    pub fn headers(&self) -> &[String] {
        self.mapper.headers()
    }

    pub fn mapping(&self) -> &FieldMapping {
        self.mapper.mapping()
    }

    pub fn live_issues(&self) -> &[LiveIssue] {
        &self.live_issues
    }

    /// Message of the most recent live issue.
    pub fn live_message(&self) -> Option<String> {
        self.live_issues.last().map(LiveIssue::to_string)
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    pub fn outcome(&self) -> &SubmissionOutcome {
        &self.outcome
    }

    pub fn feedback(&self) -> Option<&Feedback> {
        self.feedback.as_ref()
    }

    pub fn editor_open(&self) -> bool {
        self.editor_open
    }

    pub fn import_pending(&self) -> bool {
        self.import_pending
    }

    pub fn last_submission(&self) -> Option<&SubmissionReport> {
        self.last_submission.as_ref()
    }

    /// Import trigger is disabled while a read is pending.
    pub fn can_import(&self) -> bool {
        !self.import_pending
    }

    /// Confirm is disabled while a required field is unmapped or a live
    /// issue is reported.
    pub fn can_confirm(&self) -> bool {
        !self.table.is_empty()
            && self.mapping().missing_required().is_empty()
            && self.live_issues.is_empty()
    }

    /// Submit is disabled while there is no dataset or a submission is in flight.
    pub fn can_submit(&self) -> bool {
        !self.dataset.is_empty() && !self.outcome.is_in_flight()
    }

    pub fn submit_label(&self) -> &'static str {
        if self.outcome.is_in_flight() {
            SUBMITTING_LABEL
        } else {
            SUBMIT_LABEL
        }
    }

    // =========================================================================
    // Import
    // =========================================================================

    /// Mark a file read as started.
    pub fn begin_import(&mut self) -> ImportResult<()> {
        if self.import_pending {
            let err = ImportError::ImportInProgress;
            log_warning(err.to_string());
            self.feedback = Some(Feedback::error(format!("Error: {}", err)));
            return Err(err);
        }
        self.import_pending = true;
        Ok(())
    }

    /// Complete a read started with [`Session::begin_import`].
    pub fn finish_import(&mut self, result: ImportResult<DecodedText>) -> ImportResult<&RawTable> {
        self.import_pending = false;
        match result {
            Ok(decoded) => self.load_text(&decoded.text, Some(decoded.encoding)),
            Err(e) => {
                log_error(format!("Import failed: {}", e));
                self.feedback = Some(Feedback::error(format!("Error: {}", e)));
                Err(e)
            }
        }
    }

    /// Read a file into the session.
    pub async fn import_file(&mut self, path: impl AsRef<Path>, max_size: u64) -> ImportResult<&RawTable> {
        self.begin_import()?;
        let result = read_file(path, max_size).await;
        self.finish_import(result)
    }

    /// Decode raw bytes into the session.
    pub fn import_bytes(&mut self, bytes: &[u8]) -> ImportResult<&RawTable> {
        self.begin_import()?;
        let result = decode_bytes(bytes);
        self.finish_import(result)
    }

    /// Replace the table with the tokenized `text`.
    ///
    /// The dataset is cleared, the outcome goes back to idle and mapping
    /// entries naming a vanished header are unmapped. Surviving entries are
    /// checked again against the new rows.
    pub fn load_text(&mut self, text: &str, encoding: Option<String>) -> ImportResult<&RawTable> {
        self.table = tokenize(text);
        self.encoding = encoding;
        self.dataset = Dataset::default();
        self.outcome = SubmissionOutcome::Idle;
        self.active_submission = None;
        self.feedback = None;

        let cleared = self.mapper.rebind(&self.table.headers);
        for field in &cleared {
            log_warning(format!("Mapping for {} cleared: column no longer exists", field));
        }
        self.recheck_live_issues();

        if self.table.is_empty() {
            self.editor_open = false;
            let err = ImportError::EmptyInput;
            log_error(err.to_string());
            self.feedback = Some(Feedback::error(format!("Error: {}", err)));
            return Err(err);
        }

        log_success(format!(
            "Read {} rows with {} columns",
            self.table.rows.len(),
            self.table.headers.len()
        ));
        self.editor_open = true;
        Ok(&self.table)
    }

    fn recheck_live_issues(&mut self) {
        self.live_issues = LogicalField::ALL
            .into_iter()
            .filter_map(|field| {
                let header = self.mapper.mapping().get(field)?;
                check_column(&self.table, field, header)
            })
            .collect();
    }

    // =========================================================================
    // Mapping editor
    // =========================================================================

    /// Reopen the mapping editor for the current table.
    pub fn open_editor(&mut self) {
        if !self.table.is_empty() {
            self.editor_open = true;
        }
    }

    /// Bind `field` to `header` (or unmap it with `""`) and run the live
    /// check for that field. Returns the field's live issue, if any.
    pub fn set_mapping(&mut self, field: LogicalField, header: &str) -> MappingResult<Option<&LiveIssue>> {
        if let Err(e) = self.mapper.assign(field, header) {
            self.feedback = Some(Feedback::error(format!("Error: {}", e)));
            return Err(e);
        }

        self.live_issues.retain(|issue| issue.field != field);
        if let Some(issue) = check_column(&self.table, field, header) {
            log_warning(issue.to_string());
            self.live_issues.push(issue);
            return Ok(self.live_issues.last());
        }
        Ok(None)
    }

    /// Same as [`Session::set_mapping`] with the field given by name.
    pub fn set_mapping_named(&mut self, field: &str, header: &str) -> MappingResult<Option<&LiveIssue>> {
        match field.parse::<LogicalField>() {
            Ok(field) => self.set_mapping(field, header),
            Err(e) => {
                self.feedback = Some(Feedback::error(format!("Error: {}", e)));
                Err(e)
            }
        }
    }

    /// Unmap every field.
    pub fn reset_mapping(&mut self) {
        self.mapper.reset();
        self.live_issues.clear();
        log_info("Mapping reset");
    }

    /// Close the editor without touching the dataset.
    pub fn cancel_mapping(&mut self) {
        self.editor_open = false;
    }

    /// Project and validate with the current mapping.
    ///
    /// On success the records replace the dataset and the outcome returns to
    /// idle. On failure the dataset is left as it was and the error becomes
    /// the feedback line. The editor closes either way.
    pub fn confirm_mapping(&mut self) -> Result<&Dataset, ValidationError> {
        self.editor_open = false;

        match self.validated_dataset() {
            Ok(dataset) => {
                log_success(format!("Mapped {} records", dataset.len()));
                self.dataset = dataset;
                self.outcome = SubmissionOutcome::Idle;
                self.active_submission = None;
                self.feedback = None;
                Ok(&self.dataset)
            }
            Err(e) => {
                log_error(e.to_string());
                self.feedback = Some(Feedback::error(format!("Error: {}", e)));
                Err(e)
            }
        }
    }

    fn validated_dataset(&self) -> Result<Dataset, ValidationError> {
        let mapping = self.mapper.mapping();
        if !mapping.missing_required().is_empty() {
            return Err(ValidationError::MissingRequiredMapping);
        }
        if let Some(issue) = self.live_issues.last() {
            return Err(ValidationError::EmptyOrMalformedFieldLive(issue.clone()));
        }
        validate(mapping, project(&self.table, mapping))
    }

    // =========================================================================
    // Submission
    // =========================================================================

    /// Start a submission of the current dataset.
    ///
    /// Refused while another submission is in flight. An empty dataset ends
    /// immediately in `failed(no data)`.
    pub fn begin_submit(&mut self) -> Result<SubmitTicket, SubmitError> {
        if self.outcome.is_in_flight() {
            let err = SubmitError::SubmissionInProgress;
            log_warning(err.to_string());
            self.feedback = Some(Feedback::error(format!("Error: {}", err)));
            return Err(err);
        }

        if self.dataset.is_empty() {
            let err = SubmitError::NoDataToSubmit;
            log_error(NO_DATA_MESSAGE);
            self.outcome = SubmissionOutcome::Failed(err.clone());
            self.feedback = Some(Feedback::error(NO_DATA_MESSAGE));
            return Err(err);
        }

        let ticket = SubmitTicket {
            id: Uuid::new_v4(),
            dataset: self.dataset.clone(),
            started_at: Utc::now(),
        };
        log_info(format!("Submission {} started ({} records)", ticket.id, ticket.dataset.len()));

        self.outcome = SubmissionOutcome::InFlight;
        self.active_submission = Some(ticket.id);
        self.feedback = None;
        Ok(ticket)
    }

    /// Record the result of the submission identified by `ticket`.
    ///
    /// A result for a submission that is no longer active (the dataset was
    /// replaced meanwhile) is logged and otherwise ignored.
    pub fn finish_submit(&mut self, ticket: &SubmitTicket, outcome: SubmissionOutcome) -> &SubmissionOutcome {
        if self.active_submission != Some(ticket.id) {
            log_warning(format!("Ignoring result of stale submission {}", ticket.id));
            return &self.outcome;
        }
        self.active_submission = None;

        self.feedback = Some(match &outcome {
            SubmissionOutcome::Failed(e) => {
                log_error(format!("Submission {} failed: {}", ticket.id, e.detail()));
                Feedback::error(format!("Error submitting data ({}). Please try again.", e))
            }
            _ => {
                log_success(format!("Submission {} succeeded", ticket.id));
                Feedback::success(SUBMIT_SUCCESS_MESSAGE)
            }
        });

        self.last_submission = Some(SubmissionReport {
            id: ticket.id,
            record_count: ticket.dataset.len(),
            started_at: ticket.started_at,
            finished_at: Utc::now(),
            state: outcome.label(),
            reason: outcome.reason(),
        });
        self.outcome = outcome;
        &self.outcome
    }

    /// Submit the dataset and wait for the outcome.
    pub async fn submit(&mut self, submitter: &Submitter) -> SubmissionOutcome {
        let ticket = match self.begin_submit() {
            Ok(ticket) => ticket,
            Err(_) => return self.outcome.clone(),
        };
        let outcome = submitter.submit(&ticket.dataset).await;
        self.finish_submit(&ticket, outcome).clone()
    }
}
