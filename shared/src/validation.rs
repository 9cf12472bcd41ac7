//! Member validation rules
//!
//! Single source of truth for the member business rules. The server runs
//! these in the create/update handlers; the edit form runs the same pass
//! before submission as a UX early warning. Violations are accumulated and
//! reported together, never fail-fast.

use chrono::{Datelike, NaiveDate};

use crate::models::{Gender, NormalizedMember};

/// Minimum plausible age gap between a parent and a child, in years.
///
/// A sanity check against data-entry slips, not a hard biological rule.
pub const MIN_PARENT_CHILD_GAP_YEARS: i32 = 16;

/// Violation emitted when neither parent is selected.
///
/// Exposed so the server can exempt the first member of an empty tree
/// (the root ancestor has no recorded parents).
pub const PARENT_REQUIRED: &str = "At least one of father or mother must be selected";

/// The facts the member rules are judged against
///
/// `has_father`/`has_mother` reflect the supplied selection (a malformed id
/// still counts as a selection); parent birth years come from the resolved
/// parent records when available.
#[derive(Debug, Clone, Default)]
pub struct MemberDraft {
    pub full_name: Option<String>,
    pub gender: Option<Gender>,
    pub hometown: Option<String>,
    pub ethnicity: Option<String>,
    pub nationality: Option<String>,
    pub role: Option<String>,
    pub generation: Option<i32>,
    pub has_father: bool,
    pub has_mother: bool,
    pub is_alive: bool,
    pub birth_year: Option<i32>,
    pub birth_date: Option<NaiveDate>,
    pub death_year: Option<i32>,
    pub death_date: Option<NaiveDate>,
    pub father_birth_year: Option<i32>,
    pub mother_birth_year: Option<i32>,
}

impl MemberDraft {
    /// Build a draft from a normalized payload plus the resolved parents'
    /// birth years.
    pub fn from_normalized(
        norm: &NormalizedMember,
        father_birth_year: Option<i32>,
        mother_birth_year: Option<i32>,
    ) -> Self {
        Self {
            full_name: norm.full_name.clone(),
            gender: norm.gender,
            hometown: norm.hometown.clone(),
            ethnicity: norm.ethnicity.clone(),
            nationality: norm.nationality.clone(),
            role: norm.role.clone(),
            generation: norm.generation,
            has_father: norm.father.selected,
            has_mother: norm.mother.selected,
            is_alive: norm.is_alive,
            birth_year: norm.birth_year,
            birth_date: norm.birth_date,
            death_year: norm.death_year,
            death_date: norm.death_date,
            father_birth_year,
            mother_birth_year,
        }
    }
}

/// Run the full member rule list against `draft`.
///
/// Returns every violated rule as a human-readable message; an empty vec
/// means the draft passes.
pub fn validate_member(draft: &MemberDraft, today: NaiveDate) -> Vec<String> {
    let mut errors = Vec::new();

    // 必填字段
    if draft.full_name.is_none() {
        errors.push("Full name is required".to_string());
    }
    if draft.gender.is_none() {
        errors.push("Gender is required".to_string());
    }
    if draft.hometown.is_none() {
        errors.push("Hometown is required".to_string());
    }
    if draft.ethnicity.is_none() {
        errors.push("Ethnicity is required".to_string());
    }
    if draft.nationality.is_none() {
        errors.push("Nationality is required".to_string());
    }

    // 亲属关系
    if !draft.has_father && !draft.has_mother {
        errors.push(PARENT_REQUIRED.to_string());
    }
    if draft.role.is_none() {
        errors.push("Family role is required".to_string());
    }
    if draft.generation.is_none() {
        errors.push("Generation is required".to_string());
    }

    // 出生日期
    if let Some(birth_date) = draft.birth_date {
        if birth_date > today {
            errors.push("Birth date cannot be in the future".to_string());
        }
    }
    if let Some(birth_year) = draft.birth_year {
        if birth_year > today.year() {
            errors.push("Birth year cannot be beyond the current year".to_string());
        }
    }

    // 死亡日期 (仅当已故)
    if !draft.is_alive {
        if let Some(death_date) = draft.death_date {
            if death_date > today {
                errors.push("Death date cannot be in the future".to_string());
            }
            if let Some(birth_date) = draft.birth_date {
                if death_date < birth_date {
                    errors.push("Death date must be after birth date".to_string());
                }
            }
        }
        if let Some(death_year) = draft.death_year {
            if death_year > today.year() {
                errors.push("Death year cannot be beyond the current year".to_string());
            }
            if let Some(birth_year) = draft.birth_year {
                if death_year < birth_year {
                    errors.push("Death year must be after birth year".to_string());
                }
            }
        }
    }

    // 亲子年龄差 (父母双方同样适用)
    if let (Some(child_year), Some(parent_year)) = (draft.birth_year, draft.father_birth_year) {
        if parent_year > 0 && child_year - parent_year < MIN_PARENT_CHILD_GAP_YEARS {
            errors.push(format!(
                "Child must be born at least {} years after the father",
                MIN_PARENT_CHILD_GAP_YEARS
            ));
        }
    }
    if let (Some(child_year), Some(parent_year)) = (draft.birth_year, draft.mother_birth_year) {
        if parent_year > 0 && child_year - parent_year < MIN_PARENT_CHILD_GAP_YEARS {
            errors.push(format!(
                "Child must be born at least {} years after the mother",
                MIN_PARENT_CHILD_GAP_YEARS
            ));
        }
    }

    errors
}
