//! Async driver for the member edit form
//!
//! Connects [`MemberForm`] to the HTTP client: fetch on open, image upload
//! and record update on submit. All state transitions stay inside the form.

use crate::error::ClientResult;
use crate::form::{FormState, MemberForm};
use crate::http::HttpClient;
use shared::models::Member;

/// Upload folder for member profile images
const MEMBER_IMAGE_FOLDER: &str = "members";

/// Result of a submit attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Validation violations (or wrong state) blocked the submission
    Blocked,
    /// The member was saved; the embedder should refresh its data
    Saved,
    /// The server rejected the update; the form stays open for correction
    Rejected(String),
}

/// Drives one member edit form against the server
pub struct MemberEditor {
    http: HttpClient,
    tree_id: i64,
    form: MemberForm,
}

impl MemberEditor {
    pub fn new(http: HttpClient, tree_id: i64, roster: Vec<Member>) -> Self {
        Self {
            http,
            tree_id,
            form: MemberForm::new(roster),
        }
    }

    pub fn form(&self) -> &MemberForm {
        &self.form
    }

    pub fn form_mut(&mut self) -> &mut MemberForm {
        &mut self.form
    }

    /// Open the form for a member and fetch its record
    ///
    /// A fetch that resolves after the form was re-opened for a different
    /// member is discarded by the ticket check.
    pub async fn open(&mut self, member_id: i64) {
        let ticket = self.form.open(member_id);

        match self.http.get_member(self.tree_id, member_id).await {
            Ok(record) => {
                if !self.form.load_succeeded(&ticket, &record) {
                    tracing::debug!(member_id, "Discarded stale member load");
                }
            }
            Err(e) => {
                self.form
                    .load_failed(&ticket, format!("Failed to load member: {e}"));
            }
        }
    }

    /// Validate, upload a pending image if any, and send the update
    ///
    /// An image upload failure is reported but does not abort the
    /// submission; the previously stored image reference is kept.
    pub async fn submit(&mut self) -> ClientResult<SubmitOutcome> {
        let today = chrono::Local::now().date_naive();
        if !self.form.begin_submit(today) {
            return Ok(SubmitOutcome::Blocked);
        }

        let Some(member_id) = self.form.member_id() else {
            self.form.submit_failed("No member loaded");
            return Ok(SubmitOutcome::Blocked);
        };

        if let Some(attachment) = self.form.attachment().cloned() {
            match self
                .http
                .upload_image(
                    MEMBER_IMAGE_FOLDER,
                    &attachment.file_name,
                    &attachment.mime,
                    attachment.bytes,
                )
                .await
            {
                Ok(uploaded) => self.form_mut().set_uploaded_image(uploaded.url),
                Err(e) => {
                    tracing::warn!(error = %e, "Profile image upload failed");
                    self.form
                        .push_error(format!("Failed to upload profile image: {e}"));
                }
            }
        }

        let payload = self.form.prepare_payload();
        match self
            .http
            .update_member(self.tree_id, member_id, &payload)
            .await
        {
            Ok(_) => {
                self.form.submit_succeeded();
                debug_assert_eq!(self.form.state(), FormState::Closed);
                Ok(SubmitOutcome::Saved)
            }
            Err(e) => {
                let message = e.to_string();
                self.form.submit_failed(message.clone());
                Ok(SubmitOutcome::Rejected(message))
            }
        }
    }
}
