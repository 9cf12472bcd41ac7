//! Member edit-form state machine
//!
//! Mirrors one member record into an editable set of fields, independent of
//! any UI toolkit. The embedding shell renders [`MemberForm::fields`] and
//! routes user input through the mutators here; async work (load, upload,
//! submit) is driven by [`crate::MemberEditor`].
//!
//! States: `Closed` → `Loading` → `Ready` → `Submitting` → `Closed` on
//! success, or back to `Ready` with the error surfaced. Re-opening while a
//! load is in flight bumps a generation counter so the stale response is
//! discarded when it eventually arrives.

pub mod dates;

use chrono::{Datelike, NaiveDate};

use shared::models::{Gender, Member, MemberPayload, MemberWithChildren, RELATION_NONE};
use shared::validation::{MemberDraft, validate_member};

use self::dates::{format_date_input, parse_date_input};

/// Maximum size of a profile image attachment (5 MiB)
pub const MAX_IMAGE_SIZE: usize = 5 * 1024 * 1024;

/// Form lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormState {
    Closed,
    Loading,
    Ready,
    Submitting,
}

/// Transient notification for the embedding shell to display
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Success(String),
    Error(String),
}

/// Handle identifying one load request
///
/// A response is only applied while its ticket matches the most recent
/// `open` call; anything older is discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadTicket {
    member_id: i64,
    generation: u64,
}

impl LoadTicket {
    pub fn member_id(&self) -> i64 {
        self.member_id
    }
}

/// A locally selected profile image, not yet uploaded
#[derive(Debug, Clone)]
pub struct ImageAttachment {
    pub file_name: String,
    pub mime: String,
    pub bytes: Vec<u8>,
}

impl ImageAttachment {
    /// Build an attachment from raw bytes, guessing the MIME type from the
    /// file name
    pub fn from_bytes(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let file_name = file_name.into();
        let mime = mime_guess::from_path(&file_name)
            .first_or_octet_stream()
            .to_string();
        Self {
            file_name,
            mime,
            bytes,
        }
    }
}

/// What the image slot currently shows
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImagePreview {
    /// The stored image URL from the member record
    Stored(String),
    /// A pending local attachment
    Pending,
}

/// Which date field a dual-entry edit targets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateField {
    Birth,
    Death,
}

/// The editable mirror of one member record
///
/// Year/generation fields stay as raw strings so user keystrokes are never
/// discarded; they are parsed at validation/submit time. Relationship
/// selectors hold `""`, the `"none"` sentinel, or a member id string.
#[derive(Debug, Clone)]
pub struct FormFields {
    pub full_name: String,
    pub gender: Option<Gender>,
    pub birth_year: String,
    pub birth_date: Option<NaiveDate>,
    pub birth_date_input: String,
    pub birth_date_lunar: String,
    pub birth_place: String,
    pub death_year: String,
    pub death_date: Option<NaiveDate>,
    pub death_date_input: String,
    pub death_date_lunar: String,
    pub death_place: String,
    pub role: String,
    pub generation: String,
    pub father_id: String,
    pub mother_id: String,
    pub spouse_id: String,
    pub occupation: String,
    pub biography: String,
    pub notes: String,
    pub is_alive: bool,
    pub hometown: String,
    pub ethnicity: String,
    pub nationality: String,
    pub religion: String,
    pub title: String,
    pub image: String,
}

impl Default for FormFields {
    fn default() -> Self {
        Self {
            full_name: String::new(),
            gender: None,
            birth_year: String::new(),
            birth_date: None,
            birth_date_input: String::new(),
            birth_date_lunar: String::new(),
            birth_place: String::new(),
            death_year: String::new(),
            death_date: None,
            death_date_input: String::new(),
            death_date_lunar: String::new(),
            death_place: String::new(),
            role: String::new(),
            generation: String::new(),
            father_id: String::new(),
            mother_id: String::new(),
            spouse_id: String::new(),
            occupation: String::new(),
            biography: String::new(),
            notes: String::new(),
            is_alive: true,
            hometown: String::new(),
            ethnicity: String::new(),
            nationality: String::new(),
            religion: String::new(),
            title: String::new(),
            image: String::new(),
        }
    }
}

/// Member edit-form state machine
#[derive(Debug)]
pub struct MemberForm {
    state: FormState,
    member_id: Option<i64>,
    load_generation: u64,
    roster: Vec<Member>,
    fields: FormFields,
    attachment: Option<ImageAttachment>,
    preview: Option<ImagePreview>,
    validation_errors: Vec<String>,
    notices: Vec<Notice>,
}

impl MemberForm {
    /// Create a closed form over the tree's member roster
    ///
    /// The roster feeds the relationship selectors and the parent age-gap
    /// check; refresh it with [`MemberForm::set_roster`] when the tree
    /// changes.
    pub fn new(roster: Vec<Member>) -> Self {
        Self {
            state: FormState::Closed,
            member_id: None,
            load_generation: 0,
            roster,
            fields: FormFields::default(),
            attachment: None,
            preview: None,
            validation_errors: Vec::new(),
            notices: Vec::new(),
        }
    }

    pub fn state(&self) -> FormState {
        self.state
    }

    pub fn member_id(&self) -> Option<i64> {
        self.member_id
    }

    pub fn fields(&self) -> &FormFields {
        &self.fields
    }

    /// Direct two-way binding for plain text/select/switch fields
    pub fn fields_mut(&mut self) -> &mut FormFields {
        &mut self.fields
    }

    pub fn roster(&self) -> &[Member] {
        &self.roster
    }

    pub fn set_roster(&mut self, roster: Vec<Member>) {
        self.roster = roster;
    }

    pub fn validation_errors(&self) -> &[String] {
        &self.validation_errors
    }

    pub fn attachment(&self) -> Option<&ImageAttachment> {
        self.attachment.as_ref()
    }

    pub fn preview(&self) -> Option<&ImagePreview> {
        self.preview.as_ref()
    }

    /// Drain pending notifications for display
    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    pub(crate) fn push_error(&mut self, message: impl Into<String>) {
        self.notices.push(Notice::Error(message.into()));
    }

    // ========== Open / load ==========

    /// Open the form for a member, entering `Loading`
    ///
    /// Re-opening while a previous load is still in flight invalidates the
    /// older ticket.
    pub fn open(&mut self, member_id: i64) -> LoadTicket {
        self.state = FormState::Loading;
        self.member_id = Some(member_id);
        self.load_generation += 1;
        self.fields = FormFields::default();
        self.attachment = None;
        self.preview = None;
        self.validation_errors.clear();
        LoadTicket {
            member_id,
            generation: self.load_generation,
        }
    }

    /// Close the form, discarding any edits
    pub fn close(&mut self) {
        self.state = FormState::Closed;
        self.member_id = None;
        self.attachment = None;
        self.preview = None;
        self.validation_errors.clear();
    }

    fn ticket_is_current(&self, ticket: &LoadTicket) -> bool {
        ticket.generation == self.load_generation && Some(ticket.member_id) == self.member_id
    }

    /// Apply a fetched member record; returns false if the ticket is stale
    /// (the response is discarded)
    pub fn load_succeeded(&mut self, ticket: &LoadTicket, record: &MemberWithChildren) -> bool {
        if !self.ticket_is_current(ticket) || self.state != FormState::Loading {
            return false;
        }

        let m = &record.member;
        self.fields = FormFields {
            full_name: m.full_name.clone(),
            gender: Some(m.gender),
            birth_year: m.birth_year.map(|y| y.to_string()).unwrap_or_default(),
            birth_date: m.birth_date,
            birth_date_input: m.birth_date.map(format_date_input).unwrap_or_default(),
            birth_date_lunar: m.birth_date_lunar.clone().unwrap_or_default(),
            birth_place: m.birth_place.clone().unwrap_or_default(),
            death_year: m.death_year.map(|y| y.to_string()).unwrap_or_default(),
            death_date: m.death_date,
            death_date_input: m.death_date.map(format_date_input).unwrap_or_default(),
            death_date_lunar: m.death_date_lunar.clone().unwrap_or_default(),
            death_place: m.death_place.clone().unwrap_or_default(),
            role: m.role.clone(),
            generation: m.generation.to_string(),
            father_id: m.father_id.map(|id| id.to_string()).unwrap_or_default(),
            mother_id: m.mother_id.map(|id| id.to_string()).unwrap_or_default(),
            spouse_id: m.spouse_id.map(|id| id.to_string()).unwrap_or_default(),
            occupation: m.occupation.clone().unwrap_or_default(),
            biography: m.biography.clone().unwrap_or_default(),
            notes: m.notes.clone().unwrap_or_default(),
            is_alive: m.is_alive,
            hometown: m.hometown.clone(),
            ethnicity: m.ethnicity.clone(),
            nationality: m.nationality.clone(),
            religion: m.religion.clone().unwrap_or_default(),
            title: m.title.clone().unwrap_or_default(),
            image: m.image.clone().unwrap_or_default(),
        };
        self.preview = m.image.clone().map(ImagePreview::Stored);
        self.state = FormState::Ready;
        true
    }

    /// Record a load failure; returns false if the ticket is stale
    ///
    /// The form stays in `Loading` with a notification, matching the UI
    /// behavior of showing the loading placeholder until re-opened.
    pub fn load_failed(&mut self, ticket: &LoadTicket, message: impl Into<String>) -> bool {
        if !self.ticket_is_current(ticket) {
            return false;
        }
        self.push_error(message);
        true
    }

    // ========== Field editing ==========

    /// Free-text entry into a date field (`dd-mm-yyyy`)
    ///
    /// The raw string is always kept so keystrokes survive; only a fully
    /// valid date updates the date value, the year, and the formatted text.
    pub fn set_date_input(&mut self, field: DateField, input: &str) {
        match field {
            DateField::Birth => self.fields.birth_date_input = input.to_string(),
            DateField::Death => self.fields.death_date_input = input.to_string(),
        }

        if let Some(date) = parse_date_input(input) {
            self.set_date(field, Some(date));
        }
    }

    /// Calendar entry into a date field
    ///
    /// Derives the year field and the `dd-mm-yyyy` text from the date.
    pub fn set_date(&mut self, field: DateField, date: Option<NaiveDate>) {
        match field {
            DateField::Birth => {
                self.fields.birth_date = date;
                if let Some(d) = date {
                    self.fields.birth_year = d.year().to_string();
                    self.fields.birth_date_input = format_date_input(d);
                }
            }
            DateField::Death => {
                self.fields.death_date = date;
                if let Some(d) = date {
                    self.fields.death_year = d.year().to_string();
                    self.fields.death_date_input = format_date_input(d);
                }
            }
        }
    }

    pub fn set_alive(&mut self, is_alive: bool) {
        self.fields.is_alive = is_alive;
    }

    /// Select a local image file
    ///
    /// Only files with an `image/*` MIME type up to 5 MiB are accepted;
    /// anything else is rejected with a notification and no state change.
    pub fn attach_image(&mut self, attachment: ImageAttachment) -> bool {
        if !attachment.mime.starts_with("image/") {
            self.push_error("Please select an image file");
            return false;
        }
        if attachment.bytes.len() > MAX_IMAGE_SIZE {
            self.push_error("Image size must not exceed 5MB");
            return false;
        }

        self.attachment = Some(attachment);
        self.preview = Some(ImagePreview::Pending);
        true
    }

    /// Remove the image: clears the pending attachment, the preview, and
    /// the stored image reference
    pub fn remove_image(&mut self) {
        self.attachment = None;
        self.preview = None;
        self.fields.image.clear();
    }

    /// Record a completed upload: the stored reference now points at the
    /// uploaded file
    pub(crate) fn set_uploaded_image(&mut self, url: String) {
        self.attachment = None;
        self.preview = Some(ImagePreview::Stored(url.clone()));
        self.fields.image = url;
    }

    // ========== Derived data ==========

    /// Members eligible as spouse: same generation, excluding the member
    /// being edited
    pub fn eligible_spouses(&self) -> Vec<&Member> {
        let Some(generation) = parse_i32(&self.fields.generation) else {
            return Vec::new();
        };

        self.roster
            .iter()
            .filter(|m| Some(m.id) != self.member_id && m.generation == generation)
            .collect()
    }

    // ========== Validation / submit ==========

    /// Run the full rule list; stores and returns whether the form is clean
    pub fn validate(&mut self, today: NaiveDate) -> bool {
        let draft = self.build_draft();
        self.validation_errors = validate_member(&draft, today);
        self.validation_errors.is_empty()
    }

    fn build_draft(&self) -> MemberDraft {
        let father = selection(&self.fields.father_id);
        let mother = selection(&self.fields.mother_id);

        MemberDraft {
            full_name: non_empty(&self.fields.full_name),
            gender: self.fields.gender,
            hometown: non_empty(&self.fields.hometown),
            ethnicity: non_empty(&self.fields.ethnicity),
            nationality: non_empty(&self.fields.nationality),
            role: non_empty(&self.fields.role),
            generation: parse_i32(&self.fields.generation),
            has_father: father.is_some(),
            has_mother: mother.is_some(),
            is_alive: self.fields.is_alive,
            birth_year: parse_i32(&self.fields.birth_year),
            birth_date: self.fields.birth_date,
            death_year: parse_i32(&self.fields.death_year),
            death_date: self.fields.death_date,
            father_birth_year: father.and_then(|id| self.roster_birth_year(id)),
            mother_birth_year: mother.and_then(|id| self.roster_birth_year(id)),
        }
    }

    fn roster_birth_year(&self, selection: &str) -> Option<i32> {
        let id = selection.parse::<i64>().ok()?;
        self.roster
            .iter()
            .find(|m| m.id == id)
            .and_then(|m| m.birth_year)
    }

    /// Re-validate and enter `Submitting`; returns false (blocked) while
    /// violations exist or the form is not `Ready`
    pub fn begin_submit(&mut self, today: NaiveDate) -> bool {
        if self.state != FormState::Ready {
            return false;
        }
        if !self.validate(today) {
            return false;
        }
        self.state = FormState::Submitting;
        true
    }

    /// Build the payload to send, converting `"none"` selections to absent
    pub fn prepare_payload(&self) -> MemberPayload {
        let f = &self.fields;
        MemberPayload {
            full_name: non_empty(&f.full_name),
            gender: f.gender,
            birth_year: parse_i32(&f.birth_year),
            birth_date: f.birth_date,
            birth_date_lunar: non_empty(&f.birth_date_lunar),
            birth_place: non_empty(&f.birth_place),
            death_year: parse_i32(&f.death_year),
            death_date: f.death_date,
            death_date_lunar: non_empty(&f.death_date_lunar),
            death_place: non_empty(&f.death_place),
            is_alive: Some(f.is_alive),
            biography: non_empty(&f.biography),
            image: non_empty(&f.image),
            generation: parse_i32(&f.generation),
            role: non_empty(&f.role),
            occupation: non_empty(&f.occupation),
            notes: non_empty(&f.notes),
            hometown: non_empty(&f.hometown),
            ethnicity: non_empty(&f.ethnicity),
            nationality: non_empty(&f.nationality),
            religion: non_empty(&f.religion),
            title: non_empty(&f.title),
            father_id: selection(&f.father_id).map(str::to_owned),
            mother_id: selection(&f.mother_id).map(str::to_owned),
            spouse_id: selection(&f.spouse_id).map(str::to_owned),
        }
    }

    /// Submission succeeded: notify and close
    pub fn submit_succeeded(&mut self) {
        self.notices
            .push(Notice::Success("Member updated successfully".to_string()));
        self.close();
    }

    /// Submission failed: surface the server message, stay editable
    pub fn submit_failed(&mut self, message: impl Into<String>) {
        self.push_error(message);
        self.state = FormState::Ready;
    }
}

/// A selector value counts as a selection unless empty or the sentinel
fn selection(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    if trimmed.is_empty() || trimmed == RELATION_NONE {
        None
    } else {
        Some(trimmed)
    }
}

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn parse_i32(value: &str) -> Option<i32> {
    value.trim().parse().ok()
}
