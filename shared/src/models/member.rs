//! Member Model
//!
//! 家谱成员：生平信息 + 亲属关系 (父/母/配偶/子女)。
//!
//! Relationship fields travel over the wire as string ids so that selector
//! widgets can use the `"none"` sentinel; [`MemberPayload::normalized`]
//! turns them into typed [`RelationRef`]s before any persistence happens.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Sentinel value used by selector widgets for "no selection".
///
/// Converted to an absent value before persistence.
pub const RELATION_NONE: &str = "none";

/// Member gender
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(rename_all = "UPPERCASE"))]
pub enum Gender {
    Male,
    Female,
    Other,
}

/// Member entity (家谱成员)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Member {
    pub id: i64,
    pub family_tree_id: i64,
    pub full_name: String,
    pub gender: Gender,
    pub birth_year: Option<i32>,
    pub birth_date: Option<NaiveDate>,
    pub birth_date_lunar: Option<String>,
    pub birth_place: Option<String>,
    pub death_year: Option<i32>,
    pub death_date: Option<NaiveDate>,
    pub death_date_lunar: Option<String>,
    pub death_place: Option<String>,
    pub is_alive: bool,
    pub biography: Option<String>,
    pub image: Option<String>,
    /// 世代 (同代成员才能互为配偶)
    pub generation: i32,
    /// 家庭角色 (如 长子、次女)
    pub role: String,
    pub occupation: Option<String>,
    pub notes: Option<String>,
    pub hometown: String,
    pub ethnicity: String,
    pub nationality: String,
    pub religion: Option<String>,
    pub title: Option<String>,
    pub father_id: Option<i64>,
    pub mother_id: Option<i64>,
    pub spouse_id: Option<i64>,
    pub created_by_id: i64,
    pub updated_by_id: i64,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Member with its children id set (for list/detail views)
///
/// The children set is stored in a separate relation table; it is loaded
/// alongside the member row and flattened into the same JSON object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemberWithChildren {
    #[serde(flatten)]
    pub member: Member,
    pub children_ids: Vec<i64>,
}

/// Create/update member payload
///
/// Every field is optional so the server can run the full validation pass
/// and report all violations together instead of failing at
/// deserialization. Relationship fields are raw selector strings: a member
/// id, the [`RELATION_NONE`] sentinel, or absent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemberPayload {
    pub full_name: Option<String>,
    pub gender: Option<Gender>,
    pub birth_year: Option<i32>,
    pub birth_date: Option<NaiveDate>,
    pub birth_date_lunar: Option<String>,
    pub birth_place: Option<String>,
    pub death_year: Option<i32>,
    pub death_date: Option<NaiveDate>,
    pub death_date_lunar: Option<String>,
    pub death_place: Option<String>,
    /// 默认视为在世
    pub is_alive: Option<bool>,
    pub biography: Option<String>,
    pub image: Option<String>,
    pub generation: Option<i32>,
    pub role: Option<String>,
    pub occupation: Option<String>,
    pub notes: Option<String>,
    pub hometown: Option<String>,
    pub ethnicity: Option<String>,
    pub nationality: Option<String>,
    pub religion: Option<String>,
    pub title: Option<String>,
    pub father_id: Option<String>,
    pub mother_id: Option<String>,
    pub spouse_id: Option<String>,
}

/// A relationship selector value after normalization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RelationRef {
    /// A selection was supplied (anything other than absent/empty/"none").
    /// Malformed ids count as selected so that required-parent checks see
    /// the user's intent even after the id itself was discarded.
    pub selected: bool,
    /// The parsed member id; `None` when absent or malformed
    pub id: Option<i64>,
}

impl RelationRef {
    /// Absent selection
    pub const NONE: Self = Self {
        selected: false,
        id: None,
    };
}

/// Member payload after normalization
///
/// Text fields are trimmed with empty strings collapsed to `None`;
/// relationship strings are parsed into [`RelationRef`]s.
#[derive(Debug, Clone)]
pub struct NormalizedMember {
    pub full_name: Option<String>,
    pub gender: Option<Gender>,
    pub birth_year: Option<i32>,
    pub birth_date: Option<NaiveDate>,
    pub birth_date_lunar: Option<String>,
    pub birth_place: Option<String>,
    pub death_year: Option<i32>,
    pub death_date: Option<NaiveDate>,
    pub death_date_lunar: Option<String>,
    pub death_place: Option<String>,
    pub is_alive: bool,
    pub biography: Option<String>,
    pub image: Option<String>,
    pub generation: Option<i32>,
    pub role: Option<String>,
    pub occupation: Option<String>,
    pub notes: Option<String>,
    pub hometown: Option<String>,
    pub ethnicity: Option<String>,
    pub nationality: Option<String>,
    pub religion: Option<String>,
    pub title: Option<String>,
    pub father: RelationRef,
    pub mother: RelationRef,
    pub spouse: RelationRef,
}

impl MemberPayload {
    /// Normalize the raw payload: trim text, collapse empty strings to
    /// absent, parse relationship selectors.
    ///
    /// A malformed relationship id is logged and downgraded to absent
    /// rather than rejecting the whole request.
    pub fn normalized(&self) -> NormalizedMember {
        NormalizedMember {
            full_name: norm_text(&self.full_name),
            gender: self.gender,
            birth_year: self.birth_year,
            birth_date: self.birth_date,
            birth_date_lunar: norm_text(&self.birth_date_lunar),
            birth_place: norm_text(&self.birth_place),
            death_year: self.death_year,
            death_date: self.death_date,
            death_date_lunar: norm_text(&self.death_date_lunar),
            death_place: norm_text(&self.death_place),
            is_alive: self.is_alive.unwrap_or(true),
            biography: norm_text(&self.biography),
            image: norm_text(&self.image),
            generation: self.generation,
            role: norm_text(&self.role),
            occupation: norm_text(&self.occupation),
            notes: norm_text(&self.notes),
            hometown: norm_text(&self.hometown),
            ethnicity: norm_text(&self.ethnicity),
            nationality: norm_text(&self.nationality),
            religion: norm_text(&self.religion),
            title: norm_text(&self.title),
            father: parse_relation("father_id", &self.father_id),
            mother: parse_relation("mother_id", &self.mother_id),
            spouse: parse_relation("spouse_id", &self.spouse_id),
        }
    }
}

fn norm_text(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
}

fn parse_relation(field: &'static str, value: &Option<String>) -> RelationRef {
    match norm_text(value) {
        None => RelationRef::NONE,
        Some(s) if s == RELATION_NONE => RelationRef::NONE,
        Some(s) => match s.parse::<i64>() {
            Ok(id) => RelationRef {
                selected: true,
                id: Some(id),
            },
            Err(_) => {
                tracing::warn!(field, value = %s, "Malformed relation id, treating as absent");
                RelationRef {
                    selected: true,
                    id: None,
                }
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_strings_collapse_to_absent() {
        let payload = MemberPayload {
            full_name: Some("  Nguyen Van A  ".to_string()),
            hometown: Some("   ".to_string()),
            religion: Some(String::new()),
            ..Default::default()
        };
        let norm = payload.normalized();
        assert_eq!(norm.full_name.as_deref(), Some("Nguyen Van A"));
        assert!(norm.hometown.is_none());
        assert!(norm.religion.is_none());
        assert!(norm.is_alive);
    }

    #[test]
    fn test_none_sentinel_is_absent() {
        let payload = MemberPayload {
            father_id: Some("none".to_string()),
            mother_id: None,
            spouse_id: Some(String::new()),
            ..Default::default()
        };
        let norm = payload.normalized();
        assert_eq!(norm.father, RelationRef::NONE);
        assert_eq!(norm.mother, RelationRef::NONE);
        assert_eq!(norm.spouse, RelationRef::NONE);
    }

    #[test]
    fn test_valid_relation_id_is_parsed() {
        let payload = MemberPayload {
            father_id: Some("8675309".to_string()),
            ..Default::default()
        };
        let norm = payload.normalized();
        assert!(norm.father.selected);
        assert_eq!(norm.father.id, Some(8675309));
    }

    #[test]
    fn test_malformed_relation_id_downgraded_but_still_selected() {
        let payload = MemberPayload {
            spouse_id: Some("not-an-id".to_string()),
            ..Default::default()
        };
        let norm = payload.normalized();
        assert!(norm.spouse.selected);
        assert_eq!(norm.spouse.id, None);
    }

    #[test]
    fn test_gender_wire_format() {
        assert_eq!(serde_json::to_string(&Gender::Male).unwrap(), "\"MALE\"");
        let g: Gender = serde_json::from_str("\"FEMALE\"").unwrap();
        assert_eq!(g, Gender::Female);
    }
}
