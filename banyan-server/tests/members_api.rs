// banyan-server/tests/members_api.rs
// 成员接口集成测试 (对真实 Router 发起 oneshot 请求)

use axum::Router;
use axum::body::Body;
use http::{Request, StatusCode, header};
use serde_json::{Value, json};
use tempfile::TempDir;
use tower::ServiceExt;

use banyan_server::core::{Config, ServerState, build_router};

struct TestServer {
    app: Router,
    // Keep the work dir alive for the duration of the test
    _work_dir: TempDir,
}

impl TestServer {
    async fn start() -> Self {
        let work_dir = TempDir::new().expect("Failed to create temp work dir");
        let config = Config::with_overrides(work_dir.path().to_string_lossy(), 0);
        let state = ServerState::initialize(&config).await;
        Self {
            app: build_router(state),
            _work_dir: work_dir,
        }
    }

    async fn request(
        &self,
        method: &str,
        path: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(path);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }

        let request = match body {
            Some(json_body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json_body.to_string()))
                .expect("Failed to build request"),
            None => builder.body(Body::empty()).expect("Failed to build request"),
        };

        let response = self
            .app
            .clone()
            .oneshot(request)
            .await
            .expect("Request failed");

        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("Failed to read body");
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, value)
    }

    /// Register a user and return (token, user_id)
    async fn register(&self, username: &str) -> (String, i64) {
        let (status, body) = self
            .request(
                "POST",
                "/api/auth/register",
                None,
                Some(json!({
                    "username": username,
                    "display_name": username,
                    "password": "secret-password",
                })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "register failed: {body}");
        let token = body["data"]["token"].as_str().expect("missing token").to_string();
        let user_id = body["data"]["user"]["id"].as_i64().expect("missing user id");
        (token, user_id)
    }

    async fn create_tree(&self, token: &str, name: &str) -> i64 {
        let (status, body) = self
            .request(
                "POST",
                "/api/family-trees",
                Some(token),
                Some(json!({ "name": name })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "create tree failed: {body}");
        body["id"].as_i64().expect("missing tree id")
    }

    async fn create_member(&self, token: &str, tree_id: i64, payload: Value) -> (StatusCode, Value) {
        self.request(
            "POST",
            &format!("/api/family-trees/{tree_id}/members"),
            Some(token),
            Some(payload),
        )
        .await
    }
}

fn root_member(name: &str) -> Value {
    json!({
        "full_name": name,
        "gender": "MALE",
        "generation": 1,
        "role": "Patriarch",
        "hometown": "Ha Noi",
        "ethnicity": "Kinh",
        "nationality": "Vietnam",
        "birth_year": 1920,
    })
}

fn child_member(name: &str, gender: &str, father_id: i64, birth_year: i32) -> Value {
    json!({
        "full_name": name,
        "gender": gender,
        "generation": 2,
        "role": "Child",
        "hometown": "Ha Noi",
        "ethnicity": "Kinh",
        "nationality": "Vietnam",
        "birth_year": birth_year,
        "father_id": father_id.to_string(),
    })
}

#[tokio::test]
async fn test_register_login_me() {
    let server = TestServer::start().await;
    let (token, user_id) = server.register("alice").await;

    let (status, body) = server.request("GET", "/api/auth/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["user"]["id"].as_i64(), Some(user_id));
    assert_eq!(body["data"]["user"]["username"].as_str(), Some("alice"));

    let (status, body) = server
        .request(
            "POST",
            "/api/auth/login",
            None,
            Some(json!({ "username": "alice", "password": "secret-password" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"]["token"].as_str().is_some());

    // 错误密码：统一的 InvalidCredentials
    let (status, _) = server
        .request(
            "POST",
            "/api/auth/login",
            None,
            Some(json!({ "username": "alice", "password": "wrong" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_members_require_authentication() {
    let server = TestServer::start().await;
    let (status, _) = server
        .request("GET", "/api/family-trees/1/members", None, None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = server
        .request("GET", "/api/family-trees/1/members", Some("garbage-token"), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_forbidden_without_membership_or_creator() {
    let server = TestServer::start().await;
    let (owner_token, _) = server.register("owner").await;
    let (stranger_token, _) = server.register("stranger").await;

    let tree_id = server.create_tree(&owner_token, "Nguyen family").await;

    // 无授权用户：列表和创建都是 403，payload 是否合法无关紧要
    let (status, _) = server
        .request(
            "GET",
            &format!("/api/family-trees/{tree_id}/members"),
            Some(&stranger_token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = server
        .create_member(&stranger_token, tree_id, root_member("Intruder"))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_membership_grants_access() {
    let server = TestServer::start().await;
    let (owner_token, _) = server.register("owner2").await;
    let (guest_token, _) = server.register("guest").await;

    let tree_id = server.create_tree(&owner_token, "Tran family").await;

    let (status, _) = server
        .request(
            "POST",
            &format!("/api/family-trees/{tree_id}/memberships"),
            Some(&owner_token),
            Some(json!({ "username": "guest" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = server
        .request(
            "GET",
            &format!("/api/family-trees/{tree_id}/members"),
            Some(&guest_token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.as_array().is_some());

    // 重复授权 → 409
    let (status, _) = server
        .request(
            "POST",
            &format!("/api/family-trees/{tree_id}/memberships"),
            Some(&owner_token),
            Some(json!({ "username": "guest" })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_create_member_with_spouse_backlink() {
    let server = TestServer::start().await;
    let (token, _) = server.register("carol").await;
    let tree_id = server.create_tree(&token, "Le family").await;

    let (status, root) = server.create_member(&token, tree_id, root_member("Root")).await;
    assert_eq!(status, StatusCode::OK, "root create failed: {root}");
    let root_id = root["id"].as_i64().unwrap();

    let (status, first) = server
        .create_member(&token, tree_id, child_member("First", "FEMALE", root_id, 1945))
        .await;
    assert_eq!(status, StatusCode::OK, "first create failed: {first}");
    let first_id = first["id"].as_i64().unwrap();

    let mut second_payload = child_member("Second", "MALE", root_id, 1944);
    second_payload["spouse_id"] = json!(first_id.to_string());
    let (status, second) = server.create_member(&token, tree_id, second_payload).await;
    assert_eq!(status, StatusCode::OK, "second create failed: {second}");
    let second_id = second["id"].as_i64().unwrap();

    // 双向配偶引用
    assert_eq!(second["spouse_id"].as_i64(), Some(first_id));
    let (status, first_reloaded) = server
        .request(
            "GET",
            &format!("/api/family-trees/{tree_id}/members/{first_id}"),
            Some(&token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first_reloaded["spouse_id"].as_i64(), Some(second_id));
}

#[tokio::test]
async fn test_parent_children_set_is_idempotent() {
    let server = TestServer::start().await;
    let (token, _) = server.register("dave").await;
    let tree_id = server.create_tree(&token, "Pham family").await;

    let (_, root) = server.create_member(&token, tree_id, root_member("Root")).await;
    let root_id = root["id"].as_i64().unwrap();

    let (status, child) = server
        .create_member(&token, tree_id, child_member("Child", "MALE", root_id, 1950))
        .await;
    assert_eq!(status, StatusCode::OK);
    let child_id = child["id"].as_i64().unwrap();

    // 更新同一个孩子 (父母不变)：children 集合仍然恰好包含一次
    let mut update_payload = child_member("Child", "MALE", root_id, 1950);
    update_payload["occupation"] = json!("Farmer");
    let (status, _) = server
        .request(
            "PUT",
            &format!("/api/family-trees/{tree_id}/members/{child_id}"),
            Some(&token),
            Some(update_payload),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, root_reloaded) = server
        .request(
            "GET",
            &format!("/api/family-trees/{tree_id}/members/{root_id}"),
            Some(&token),
            None,
        )
        .await;
    let children: Vec<i64> = root_reloaded["children_ids"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_i64().unwrap())
        .collect();
    assert_eq!(
        children.iter().filter(|id| **id == child_id).count(),
        1,
        "child must appear exactly once: {children:?}"
    );
}

#[tokio::test]
async fn test_malformed_relation_ids_are_treated_as_absent() {
    let server = TestServer::start().await;
    let (token, _) = server.register("erin").await;
    let tree_id = server.create_tree(&token, "Vo family").await;

    let (_, root) = server.create_member(&token, tree_id, root_member("Root")).await;
    let root_id = root["id"].as_i64().unwrap();

    let mut payload = child_member("Odd", "MALE", root_id, 1950);
    // 乱码配偶 id：字段按缺省处理，请求本身不被拒绝
    payload["spouse_id"] = json!("definitely-not-an-id");
    let (status, created) = server.create_member(&token, tree_id, payload).await;
    assert_eq!(status, StatusCode::OK, "create failed: {created}");
    assert!(created["spouse_id"].is_null());

    // 乱码父亲 id 仍算“已选择”，满足父母至少一项的规则
    let mut payload = root_member("Odd2");
    payload["generation"] = json!(2);
    payload["father_id"] = json!("zzz");
    let (status, created) = server.create_member(&token, tree_id, payload).await;
    assert_eq!(status, StatusCode::OK, "create failed: {created}");
    assert!(created["father_id"].is_null());
}

#[tokio::test]
async fn test_server_side_validation_accumulates() {
    let server = TestServer::start().await;
    let (token, _) = server.register("frank").await;
    let tree_id = server.create_tree(&token, "Dang family").await;

    let (_, root) = server.create_member(&token, tree_id, root_member("Root")).await;
    let root_id = root["id"].as_i64().unwrap();

    // 绕过表单直接调用 API：服务端照样拒绝
    let (status, body) = server
        .create_member(
            &token,
            tree_id,
            json!({
                "gender": "MALE",
                "father_id": root_id.to_string(),
            }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let violations: Vec<&str> = body["details"]["violations"]
        .as_array()
        .expect("violations missing")
        .iter()
        .filter_map(|v| v.as_str())
        .collect();
    assert!(violations.contains(&"Full name is required"));
    assert!(violations.contains(&"Family role is required"));
    assert!(violations.contains(&"Generation is required"));
    assert!(violations.contains(&"Hometown is required"));
}

#[tokio::test]
async fn test_death_year_and_parent_gap_rules() {
    let server = TestServer::start().await;
    let (token, _) = server.register("grace").await;
    let tree_id = server.create_tree(&token, "Bui family").await;

    let (_, root) = server.create_member(&token, tree_id, root_member("Root")).await;
    let root_id = root["id"].as_i64().unwrap();

    let mut payload = child_member("Short lived", "MALE", root_id, 1950);
    payload["is_alive"] = json!(false);
    payload["death_year"] = json!(1940);
    let (status, body) = server.create_member(&token, tree_id, payload).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().contains("Death year must be after birth year"));

    // 父子年龄差不足 16 年
    let (status, parent) = server
        .create_member(&token, tree_id, child_member("Young father", "MALE", root_id, 2000))
        .await;
    assert_eq!(status, StatusCode::OK);
    let parent_id = parent["id"].as_i64().unwrap();

    let mut payload = json!({
        "full_name": "Too soon",
        "gender": "MALE",
        "generation": 3,
        "role": "Child",
        "hometown": "Ha Noi",
        "ethnicity": "Kinh",
        "nationality": "Vietnam",
        "birth_year": 2010,
    });
    payload["father_id"] = json!(parent_id.to_string());
    let (status, body) = server.create_member(&token, tree_id, payload).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(
        body["message"]
            .as_str()
            .unwrap()
            .contains("at least 16 years after the father")
    );
}

#[tokio::test]
async fn test_dangling_reference_rejected() {
    let server = TestServer::start().await;
    let (token, _) = server.register("henry").await;
    let tree_id = server.create_tree(&token, "Do family").await;

    let (_, root) = server.create_member(&token, tree_id, root_member("Root")).await;
    let root_id = root["id"].as_i64().unwrap();

    let mut payload = child_member("Orphan ref", "MALE", root_id, 1950);
    payload["spouse_id"] = json!("99999999999");
    let (status, body) = server.create_member(&token, tree_id, payload).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(
        body["message"]
            .as_str()
            .unwrap()
            .contains("Spouse reference does not exist")
    );
}

#[tokio::test]
async fn test_spouse_conflict_rejected_instead_of_overwritten() {
    let server = TestServer::start().await;
    let (token, _) = server.register("iris").await;
    let tree_id = server.create_tree(&token, "Ho family").await;

    let (_, root) = server.create_member(&token, tree_id, root_member("Root")).await;
    let root_id = root["id"].as_i64().unwrap();

    let (_, a) = server
        .create_member(&token, tree_id, child_member("A", "FEMALE", root_id, 1945))
        .await;
    let a_id = a["id"].as_i64().unwrap();

    let mut b_payload = child_member("B", "MALE", root_id, 1944);
    b_payload["spouse_id"] = json!(a_id.to_string());
    let (status, _) = server.create_member(&token, tree_id, b_payload).await;
    assert_eq!(status, StatusCode::OK);

    // 第三人试图把 A 设为配偶：拒绝而不是覆盖
    let mut c_payload = child_member("C", "MALE", root_id, 1943);
    c_payload["spouse_id"] = json!(a_id.to_string());
    let (status, body) = server.create_member(&token, tree_id, c_payload).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(
        body["message"]
            .as_str()
            .unwrap()
            .contains("Spouse is already linked")
    );
}

#[tokio::test]
async fn test_update_repoints_spouse_links() {
    let server = TestServer::start().await;
    let (token, _) = server.register("judy").await;
    let tree_id = server.create_tree(&token, "Ly family").await;

    let (_, root) = server.create_member(&token, tree_id, root_member("Root")).await;
    let root_id = root["id"].as_i64().unwrap();

    let (_, a) = server
        .create_member(&token, tree_id, child_member("A", "FEMALE", root_id, 1945))
        .await;
    let a_id = a["id"].as_i64().unwrap();

    let mut b_payload = child_member("B", "MALE", root_id, 1944);
    b_payload["spouse_id"] = json!(a_id.to_string());
    let (_, b) = server.create_member(&token, tree_id, b_payload).await;
    let b_id = b["id"].as_i64().unwrap();

    // B 解除配偶关系：A 的回链也被清除
    let mut update_payload = child_member("B", "MALE", root_id, 1944);
    update_payload["spouse_id"] = json!("none");
    let (status, updated) = server
        .request(
            "PUT",
            &format!("/api/family-trees/{tree_id}/members/{b_id}"),
            Some(&token),
            Some(update_payload),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(updated["spouse_id"].is_null());

    let (_, a_reloaded) = server
        .request(
            "GET",
            &format!("/api/family-trees/{tree_id}/members/{a_id}"),
            Some(&token),
            None,
        )
        .await;
    assert!(a_reloaded["spouse_id"].is_null());
}

#[tokio::test]
async fn test_get_member_not_found() {
    let server = TestServer::start().await;
    let (token, _) = server.register("kate").await;
    let tree_id = server.create_tree(&token, "Truong family").await;

    let (status, _) = server
        .request(
            "GET",
            &format!("/api/family-trees/{tree_id}/members/123456789"),
            Some(&token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_list_members_in_insertion_order() {
    let server = TestServer::start().await;
    let (token, _) = server.register("liam").await;
    let tree_id = server.create_tree(&token, "Dinh family").await;

    let (_, root) = server.create_member(&token, tree_id, root_member("Root")).await;
    let root_id = root["id"].as_i64().unwrap();
    for (name, year) in [("One", 1940), ("Two", 1942), ("Three", 1944)] {
        // created_at 是毫秒精度，隔开一点保证顺序稳定
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        let (status, _) = server
            .create_member(&token, tree_id, child_member(name, "MALE", root_id, year))
            .await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, body) = server
        .request(
            "GET",
            &format!("/api/family-trees/{tree_id}/members"),
            Some(&token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let names: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["full_name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["Root", "One", "Two", "Three"]);
}
