//! Member Repository
//!
//! 成员的读写都以家谱为边界；创建/更新的多行写入 (成员本体、配偶回链、
//! 父母的子女集合) 在同一个事务内完成，部分失败不会留下半截关系。

use std::collections::HashMap;

use chrono::NaiveDate;
use sqlx::{Sqlite, SqlitePool, Transaction};

use shared::models::{Member, MemberPayload, MemberWithChildren, NormalizedMember, RelationRef};
use shared::validation::{MemberDraft, validate_member};

use super::{RepoError, RepoResult};

const MEMBER_COLUMNS: &str = "id, family_tree_id, full_name, gender, birth_year, birth_date, birth_date_lunar, birth_place, death_year, death_date, death_date_lunar, death_place, is_alive, biography, image, generation, role, occupation, notes, hometown, ethnicity, nationality, religion, title, father_id, mother_id, spouse_id, created_by_id, updated_by_id, created_at, updated_at";

/// Resolved relation target inside the current tree
#[derive(Debug, Clone, sqlx::FromRow)]
struct RelationRow {
    id: i64,
    birth_year: Option<i32>,
    spouse_id: Option<i64>,
}

/// All members of a tree, in insertion order, with children sets attached
pub async fn find_by_tree(pool: &SqlitePool, tree_id: i64) -> RepoResult<Vec<MemberWithChildren>> {
    let sql = format!(
        "SELECT {MEMBER_COLUMNS} FROM member WHERE family_tree_id = ? ORDER BY created_at, id"
    );
    let members = sqlx::query_as::<_, Member>(&sql)
        .bind(tree_id)
        .fetch_all(pool)
        .await?;

    // One pass over the relation table instead of a query per member
    let pairs: Vec<(i64, i64)> = sqlx::query_as(
        "SELECT mc.parent_id, mc.child_id FROM member_child mc \
         JOIN member m ON m.id = mc.parent_id \
         WHERE m.family_tree_id = ? ORDER BY mc.child_id",
    )
    .bind(tree_id)
    .fetch_all(pool)
    .await?;

    let mut children: HashMap<i64, Vec<i64>> = HashMap::new();
    for (parent_id, child_id) in pairs {
        children.entry(parent_id).or_default().push(child_id);
    }

    Ok(members
        .into_iter()
        .map(|member| {
            let children_ids = children.remove(&member.id).unwrap_or_default();
            MemberWithChildren {
                member,
                children_ids,
            }
        })
        .collect())
}

pub async fn find_by_id_in_tree(
    pool: &SqlitePool,
    tree_id: i64,
    member_id: i64,
) -> RepoResult<Option<MemberWithChildren>> {
    let sql = format!("SELECT {MEMBER_COLUMNS} FROM member WHERE id = ? AND family_tree_id = ?");
    let member = sqlx::query_as::<_, Member>(&sql)
        .bind(member_id)
        .bind(tree_id)
        .fetch_optional(pool)
        .await?;

    let Some(member) = member else {
        return Ok(None);
    };

    let children_ids: Vec<(i64,)> =
        sqlx::query_as("SELECT child_id FROM member_child WHERE parent_id = ? ORDER BY child_id")
            .bind(member_id)
            .fetch_all(pool)
            .await?;

    Ok(Some(MemberWithChildren {
        member,
        children_ids: children_ids.into_iter().map(|(id,)| id).collect(),
    }))
}

/// Create a member.
///
/// Runs the full rule list, then inserts the member, conditionally
/// back-links the spouse and set-adds the member into each referenced
/// parent's children set — all in one transaction.
pub async fn create(
    pool: &SqlitePool,
    tree_id: i64,
    actor_id: i64,
    payload: &MemberPayload,
    today: NaiveDate,
) -> RepoResult<MemberWithChildren> {
    let norm = payload.normalized();
    let mut tx = pool.begin().await?;

    let (member_count,): (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM member WHERE family_tree_id = ?")
            .bind(tree_id)
            .fetch_one(&mut *tx)
            .await?;

    let mut violations = Vec::new();
    let father = resolve_relation(&mut tx, tree_id, &norm.father, None, "Father", &mut violations)
        .await?;
    let mother = resolve_relation(&mut tx, tree_id, &norm.mother, None, "Mother", &mut violations)
        .await?;
    let spouse = resolve_relation(&mut tx, tree_id, &norm.spouse, None, "Spouse", &mut violations)
        .await?;

    let draft = MemberDraft::from_normalized(
        &norm,
        father.as_ref().and_then(|p| p.birth_year),
        mother.as_ref().and_then(|p| p.birth_year),
    );
    violations.extend(validate_member(&draft, today));

    // 空家谱的第一位成员是始祖，允许没有父母
    if member_count == 0 {
        violations.retain(|v| v != shared::validation::PARENT_REQUIRED);
    }

    // 配偶已与他人互链则拒绝，避免静默覆盖
    if let Some(sp) = &spouse {
        if sp.spouse_id.is_some() {
            violations.push("Spouse is already linked to another member".to_string());
        }
    }

    if !violations.is_empty() {
        return Err(RepoError::Violations(violations));
    }

    let id = shared::util::snowflake_id();
    let now = shared::util::now_millis();
    insert_member(&mut tx, id, tree_id, actor_id, &norm, &father, &mother, &spouse, now).await?;

    if let Some(sp) = &spouse {
        back_link_spouse(&mut tx, sp.id, id, now).await?;
    }

    for parent in [&father, &mother].into_iter().flatten() {
        add_child(&mut tx, parent.id, id).await?;
    }

    tx.commit().await?;

    find_by_id_in_tree(pool, tree_id, id)
        .await?
        .ok_or_else(|| RepoError::Database("Failed to create member".into()))
}

/// Update a member.
///
/// Same validation pass as create. The transaction re-points the spouse
/// back-link (clearing a stale link aimed at this member first) and
/// rebuilds the member's rows in its parents' children sets.
pub async fn update(
    pool: &SqlitePool,
    tree_id: i64,
    member_id: i64,
    actor_id: i64,
    payload: &MemberPayload,
    today: NaiveDate,
) -> RepoResult<MemberWithChildren> {
    let norm = payload.normalized();
    let mut tx = pool.begin().await?;

    let sql = format!("SELECT {MEMBER_COLUMNS} FROM member WHERE id = ? AND family_tree_id = ?");
    let existing = sqlx::query_as::<_, Member>(&sql)
        .bind(member_id)
        .bind(tree_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| RepoError::NotFound(format!("Member {member_id}")))?;

    let mut violations = Vec::new();
    let father = resolve_relation(
        &mut tx,
        tree_id,
        &norm.father,
        Some(member_id),
        "Father",
        &mut violations,
    )
    .await?;
    let mother = resolve_relation(
        &mut tx,
        tree_id,
        &norm.mother,
        Some(member_id),
        "Mother",
        &mut violations,
    )
    .await?;
    let spouse = resolve_relation(
        &mut tx,
        tree_id,
        &norm.spouse,
        Some(member_id),
        "Spouse",
        &mut violations,
    )
    .await?;

    let draft = MemberDraft::from_normalized(
        &norm,
        father.as_ref().and_then(|p| p.birth_year),
        mother.as_ref().and_then(|p| p.birth_year),
    );
    violations.extend(validate_member(&draft, today));

    if let Some(sp) = &spouse {
        if sp.spouse_id.is_some() && sp.spouse_id != Some(member_id) {
            violations.push("Spouse is already linked to another member".to_string());
        }
    }

    if !violations.is_empty() {
        return Err(RepoError::Violations(violations));
    }

    let now = shared::util::now_millis();
    update_member_row(&mut tx, member_id, actor_id, &norm, &father, &mother, &spouse, now).await?;

    // 旧配偶若仍指向本成员，先清除回链
    let new_spouse_id = spouse.as_ref().map(|s| s.id);
    if let Some(old_spouse) = existing.spouse_id {
        if Some(old_spouse) != new_spouse_id {
            sqlx::query(
                "UPDATE member SET spouse_id = NULL, updated_at = ? WHERE id = ? AND spouse_id = ?",
            )
            .bind(now)
            .bind(old_spouse)
            .bind(member_id)
            .execute(&mut *tx)
            .await?;
        }
    }

    if let Some(sp) = &spouse {
        back_link_spouse(&mut tx, sp.id, member_id, now).await?;
    }

    // 重建父母 -> 子女集合
    sqlx::query("DELETE FROM member_child WHERE child_id = ?")
        .bind(member_id)
        .execute(&mut *tx)
        .await?;
    for parent in [&father, &mother].into_iter().flatten() {
        add_child(&mut tx, parent.id, member_id).await?;
    }

    tx.commit().await?;

    find_by_id_in_tree(pool, tree_id, member_id)
        .await?
        .ok_or_else(|| RepoError::NotFound(format!("Member {member_id}")))
}

/// Resolve a relation reference to a member of the same tree.
///
/// A selected-but-malformed id was already downgraded to absent by the
/// payload normalization; this only judges well-formed ids. Dangling and
/// self references become violations instead of silent writes.
async fn resolve_relation(
    tx: &mut Transaction<'_, Sqlite>,
    tree_id: i64,
    relation: &RelationRef,
    self_id: Option<i64>,
    label: &str,
    violations: &mut Vec<String>,
) -> RepoResult<Option<RelationRow>> {
    let Some(id) = relation.id else {
        return Ok(None);
    };

    if self_id == Some(id) {
        violations.push(format!("{label} cannot be the member themselves"));
        return Ok(None);
    }

    let row = sqlx::query_as::<_, RelationRow>(
        "SELECT id, birth_year, spouse_id FROM member WHERE id = ? AND family_tree_id = ?",
    )
    .bind(id)
    .bind(tree_id)
    .fetch_optional(&mut **tx)
    .await?;

    if row.is_none() {
        violations.push(format!("{label} reference does not exist in this family tree"));
    }
    Ok(row)
}

#[allow(clippy::too_many_arguments)]
async fn insert_member(
    tx: &mut Transaction<'_, Sqlite>,
    id: i64,
    tree_id: i64,
    actor_id: i64,
    norm: &NormalizedMember,
    father: &Option<RelationRow>,
    mother: &Option<RelationRow>,
    spouse: &Option<RelationRow>,
    now: i64,
) -> RepoResult<()> {
    // validate_member 已保证必填字段存在
    let (
        Some(full_name),
        Some(gender),
        Some(generation),
        Some(role),
        Some(hometown),
        Some(ethnicity),
        Some(nationality),
    ) = (
        norm.full_name.as_deref(),
        norm.gender,
        norm.generation,
        norm.role.as_deref(),
        norm.hometown.as_deref(),
        norm.ethnicity.as_deref(),
        norm.nationality.as_deref(),
    )
    else {
        return Err(RepoError::Database(
            "Validated member is missing required fields".into(),
        ));
    };

    sqlx::query(
        "INSERT INTO member (id, family_tree_id, full_name, gender, birth_year, birth_date, birth_date_lunar, birth_place, death_year, death_date, death_date_lunar, death_place, is_alive, biography, image, generation, role, occupation, notes, hometown, ethnicity, nationality, religion, title, father_id, mother_id, spouse_id, created_by_id, updated_by_id, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(id)
    .bind(tree_id)
    .bind(full_name)
    .bind(gender)
    .bind(norm.birth_year)
    .bind(norm.birth_date)
    .bind(norm.birth_date_lunar.as_deref())
    .bind(norm.birth_place.as_deref())
    .bind(norm.death_year)
    .bind(norm.death_date)
    .bind(norm.death_date_lunar.as_deref())
    .bind(norm.death_place.as_deref())
    .bind(norm.is_alive)
    .bind(norm.biography.as_deref())
    .bind(norm.image.as_deref())
    .bind(generation)
    .bind(role)
    .bind(norm.occupation.as_deref())
    .bind(norm.notes.as_deref())
    .bind(hometown)
    .bind(ethnicity)
    .bind(nationality)
    .bind(norm.religion.as_deref())
    .bind(norm.title.as_deref())
    .bind(father.as_ref().map(|p| p.id))
    .bind(mother.as_ref().map(|p| p.id))
    .bind(spouse.as_ref().map(|p| p.id))
    .bind(actor_id)
    .bind(actor_id)
    .bind(now)
    .bind(now)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

#[allow(clippy::too_many_arguments)]
async fn update_member_row(
    tx: &mut Transaction<'_, Sqlite>,
    member_id: i64,
    actor_id: i64,
    norm: &NormalizedMember,
    father: &Option<RelationRow>,
    mother: &Option<RelationRow>,
    spouse: &Option<RelationRow>,
    now: i64,
) -> RepoResult<()> {
    let (
        Some(full_name),
        Some(gender),
        Some(generation),
        Some(role),
        Some(hometown),
        Some(ethnicity),
        Some(nationality),
    ) = (
        norm.full_name.as_deref(),
        norm.gender,
        norm.generation,
        norm.role.as_deref(),
        norm.hometown.as_deref(),
        norm.ethnicity.as_deref(),
        norm.nationality.as_deref(),
    )
    else {
        return Err(RepoError::Database(
            "Validated member is missing required fields".into(),
        ));
    };

    sqlx::query(
        "UPDATE member SET full_name = ?, gender = ?, birth_year = ?, birth_date = ?, birth_date_lunar = ?, birth_place = ?, death_year = ?, death_date = ?, death_date_lunar = ?, death_place = ?, is_alive = ?, biography = ?, image = ?, generation = ?, role = ?, occupation = ?, notes = ?, hometown = ?, ethnicity = ?, nationality = ?, religion = ?, title = ?, father_id = ?, mother_id = ?, spouse_id = ?, updated_by_id = ?, updated_at = ? WHERE id = ?",
    )
    .bind(full_name)
    .bind(gender)
    .bind(norm.birth_year)
    .bind(norm.birth_date)
    .bind(norm.birth_date_lunar.as_deref())
    .bind(norm.birth_place.as_deref())
    .bind(norm.death_year)
    .bind(norm.death_date)
    .bind(norm.death_date_lunar.as_deref())
    .bind(norm.death_place.as_deref())
    .bind(norm.is_alive)
    .bind(norm.biography.as_deref())
    .bind(norm.image.as_deref())
    .bind(generation)
    .bind(role)
    .bind(norm.occupation.as_deref())
    .bind(norm.notes.as_deref())
    .bind(hometown)
    .bind(ethnicity)
    .bind(nationality)
    .bind(norm.religion.as_deref())
    .bind(norm.title.as_deref())
    .bind(father.as_ref().map(|p| p.id))
    .bind(mother.as_ref().map(|p| p.id))
    .bind(spouse.as_ref().map(|p| p.id))
    .bind(actor_id)
    .bind(now)
    .bind(member_id)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

/// Conditionally back-link the spouse: only when the target currently has
/// no spouse or already points at `member_id` (re-applying is a no-op).
async fn back_link_spouse(
    tx: &mut Transaction<'_, Sqlite>,
    spouse_id: i64,
    member_id: i64,
    now: i64,
) -> RepoResult<()> {
    sqlx::query(
        "UPDATE member SET spouse_id = ?1, updated_at = ?2 WHERE id = ?3 AND (spouse_id IS NULL OR spouse_id = ?1)",
    )
    .bind(member_id)
    .bind(now)
    .bind(spouse_id)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

/// Idempotent set-add of a child into a parent's children set
async fn add_child(
    tx: &mut Transaction<'_, Sqlite>,
    parent_id: i64,
    child_id: i64,
) -> RepoResult<()> {
    sqlx::query("INSERT OR IGNORE INTO member_child (parent_id, child_id) VALUES (?, ?)")
        .bind(parent_id)
        .bind(child_id)
        .execute(&mut **tx)
        .await?;
    Ok(())
}
