// banyan-client/tests/form_state.rs
// 编辑表单状态机测试

use banyan_client::form::{DateField, FormState, ImageAttachment, ImagePreview, MemberForm};
use chrono::NaiveDate;
use shared::models::{Gender, Member, MemberWithChildren};

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 6, 15).unwrap()
}

fn member(id: i64, full_name: &str, gender: Gender, generation: i32, birth_year: Option<i32>) -> Member {
    Member {
        id,
        family_tree_id: 1,
        full_name: full_name.to_string(),
        gender,
        birth_year,
        birth_date: None,
        birth_date_lunar: None,
        birth_place: None,
        death_year: None,
        death_date: None,
        death_date_lunar: None,
        death_place: None,
        is_alive: true,
        biography: None,
        image: None,
        generation,
        role: "Member".to_string(),
        occupation: None,
        notes: None,
        hometown: "Ha Noi".to_string(),
        ethnicity: "Kinh".to_string(),
        nationality: "Vietnam".to_string(),
        religion: None,
        title: None,
        father_id: None,
        mother_id: None,
        spouse_id: None,
        created_by_id: 1,
        updated_by_id: 1,
        created_at: 0,
        updated_at: 0,
    }
}

fn record(m: Member) -> MemberWithChildren {
    MemberWithChildren {
        member: m,
        children_ids: vec![],
    }
}

fn ready_form() -> MemberForm {
    let mut form = MemberForm::new(vec![]);
    let ticket = form.open(10);
    let mut m = member(10, "Nguyen Van A", Gender::Male, 3, Some(1950));
    m.father_id = Some(2);
    assert!(form.load_succeeded(&ticket, &record(m)));
    form
}

#[test]
fn test_open_load_populates_fields() {
    let mut form = MemberForm::new(vec![]);
    assert_eq!(form.state(), FormState::Closed);

    let ticket = form.open(10);
    assert_eq!(form.state(), FormState::Loading);

    let mut m = member(10, "Nguyen Van A", Gender::Male, 3, Some(1950));
    m.birth_date = NaiveDate::from_ymd_opt(1950, 3, 2);
    m.image = Some("/api/image/members/abc.jpg".to_string());
    assert!(form.load_succeeded(&ticket, &record(m)));

    assert_eq!(form.state(), FormState::Ready);
    assert_eq!(form.fields().full_name, "Nguyen Van A");
    assert_eq!(form.fields().birth_year, "1950");
    // 日期派生出 dd-mm-yyyy 文本
    assert_eq!(form.fields().birth_date_input, "02-03-1950");
    assert_eq!(
        form.preview(),
        Some(&ImagePreview::Stored("/api/image/members/abc.jpg".to_string()))
    );
}

#[test]
fn test_stale_load_is_discarded() {
    let mut form = MemberForm::new(vec![]);
    let first = form.open(10);
    // 用户在第一次加载完成前切换到另一个成员
    let second = form.open(20);

    // 第一次的响应晚到：必须被丢弃
    assert!(!form.load_succeeded(&first, &record(member(10, "Old", Gender::Male, 1, None))));
    assert_eq!(form.state(), FormState::Loading);

    assert!(form.load_succeeded(&second, &record(member(20, "New", Gender::Female, 1, None))));
    assert_eq!(form.state(), FormState::Ready);
    assert_eq!(form.fields().full_name, "New");
}

#[test]
fn test_load_failure_keeps_loading_state() {
    let mut form = MemberForm::new(vec![]);
    let ticket = form.open(10);
    assert!(form.load_failed(&ticket, "network down"));
    assert_eq!(form.state(), FormState::Loading);
    assert!(!form.take_notices().is_empty());
}

#[test]
fn test_date_text_entry_roundtrip() {
    let mut form = ready_form();

    form.set_date_input(DateField::Birth, "25-12-1990");
    assert_eq!(
        form.fields().birth_date,
        NaiveDate::from_ymd_opt(1990, 12, 25)
    );
    assert_eq!(form.fields().birth_year, "1990");
    assert_eq!(form.fields().birth_date_input, "25-12-1990");

    // 日历路径再格式化回相同文本
    form.set_date(DateField::Birth, NaiveDate::from_ymd_opt(1990, 12, 25));
    assert_eq!(form.fields().birth_date_input, "25-12-1990");
}

#[test]
fn test_invalid_date_text_keeps_prior_value() {
    let mut form = ready_form();
    form.set_date_input(DateField::Birth, "25-12-1990");

    form.set_date_input(DateField::Birth, "25-13-19");
    // 原日期不变，但输入的字符串保留
    assert_eq!(
        form.fields().birth_date,
        NaiveDate::from_ymd_opt(1990, 12, 25)
    );
    assert_eq!(form.fields().birth_date_input, "25-13-19");
    assert_eq!(form.fields().birth_year, "1990");
}

#[test]
fn test_eligible_spouses_same_generation_excluding_self() {
    let roster = vec![
        member(10, "Self", Gender::Male, 3, None),
        member(11, "Same generation", Gender::Female, 3, None),
        member(12, "Older generation", Gender::Female, 2, None),
        member(13, "Also same", Gender::Male, 3, None),
    ];
    let mut form = MemberForm::new(roster);
    let ticket = form.open(10);
    assert!(form.load_succeeded(&ticket, &record(member(10, "Self", Gender::Male, 3, None))));

    let spouses: Vec<i64> = form.eligible_spouses().iter().map(|m| m.id).collect();
    assert_eq!(spouses, vec![11, 13]);

    // 改变世代，候选列表跟着变
    form.fields_mut().generation = "2".to_string();
    let spouses: Vec<i64> = form.eligible_spouses().iter().map(|m| m.id).collect();
    assert_eq!(spouses, vec![12]);
}

#[test]
fn test_image_attachment_rules() {
    let mut form = ready_form();

    // 非图片类型被拒绝
    assert!(!form.attach_image(ImageAttachment::from_bytes("notes.txt", vec![1, 2, 3])));
    assert!(form.attachment().is_none());

    // 超过 5MB 被拒绝
    let oversized = ImageAttachment {
        file_name: "big.jpg".to_string(),
        mime: "image/jpeg".to_string(),
        bytes: vec![0; 5 * 1024 * 1024 + 1],
    };
    assert!(!form.attach_image(oversized));
    assert!(form.attachment().is_none());

    // 合法图片被接受并产生本地预览
    assert!(form.attach_image(ImageAttachment::from_bytes("avatar.png", vec![0; 128])));
    assert!(form.attachment().is_some());
    assert_eq!(form.preview(), Some(&ImagePreview::Pending));

    // 移除图片：附件、预览、存储引用全部清空
    form.fields_mut().image = "/api/image/members/old.jpg".to_string();
    form.remove_image();
    assert!(form.attachment().is_none());
    assert!(form.preview().is_none());
    assert!(form.fields().image.is_empty());
}

#[test]
fn test_validation_death_year_before_birth_year() {
    let mut form = ready_form();
    form.fields_mut().is_alive = false;
    form.fields_mut().birth_year = "1950".to_string();
    form.fields_mut().death_year = "1940".to_string();

    assert!(!form.validate(today()));
    assert!(
        form.validation_errors()
            .contains(&"Death year must be after birth year".to_string())
    );
    // 校验失败时提交被阻止
    assert!(!form.begin_submit(today()));
    assert_eq!(form.state(), FormState::Ready);
}

#[test]
fn test_validation_father_age_gap_from_roster() {
    let roster = vec![member(2, "Father", Gender::Male, 2, Some(2000))];
    let mut form = MemberForm::new(roster);
    let ticket = form.open(10);
    let mut m = member(10, "Child", Gender::Male, 3, Some(2010));
    m.father_id = Some(2);
    assert!(form.load_succeeded(&ticket, &record(m)));

    assert!(!form.validate(today()));
    assert!(
        form.validation_errors()
            .contains(&"Child must be born at least 16 years after the father".to_string())
    );
}

#[test]
fn test_validation_accumulates_all_violations() {
    let mut form = MemberForm::new(vec![]);
    let ticket = form.open(10);
    let mut m = member(10, "X", Gender::Male, 1, None);
    m.full_name = String::new();
    m.hometown = String::new();
    assert!(form.load_succeeded(&ticket, &record(m)));

    assert!(!form.validate(today()));
    let errors = form.validation_errors();
    assert!(errors.contains(&"Full name is required".to_string()));
    assert!(errors.contains(&"Hometown is required".to_string()));
    assert!(errors.contains(&"At least one of father or mother must be selected".to_string()));
}

#[test]
fn test_prepare_payload_converts_none_sentinel() {
    let mut form = ready_form();
    form.fields_mut().father_id = "none".to_string();
    form.fields_mut().mother_id = "12345".to_string();
    form.fields_mut().spouse_id = String::new();
    form.fields_mut().religion = "   ".to_string();

    let payload = form.prepare_payload();
    assert_eq!(payload.father_id, None);
    assert_eq!(payload.mother_id.as_deref(), Some("12345"));
    assert_eq!(payload.spouse_id, None);
    assert_eq!(payload.religion, None);
    assert_eq!(payload.is_alive, Some(true));
}

#[test]
fn test_submit_lifecycle() {
    let mut form = ready_form();

    assert!(form.begin_submit(today()));
    assert_eq!(form.state(), FormState::Submitting);

    // 服务端拒绝：回到可编辑状态并带上错误提示
    form.submit_failed("Spouse is already linked to another member");
    assert_eq!(form.state(), FormState::Ready);
    assert!(!form.take_notices().is_empty());

    // 再次提交成功：关闭表单
    assert!(form.begin_submit(today()));
    form.submit_succeeded();
    assert_eq!(form.state(), FormState::Closed);
}
