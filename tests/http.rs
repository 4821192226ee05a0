use std::sync::Arc;

use serde::Serialize;
use serde_json::{json, Value};
use slog::{o, Discard, Logger};
use warp::filters::BoxedFilter;
use warp::http::StatusCode;
use warp::hyper::body::Bytes;
use warp::Reply;

use recipebook::auth::AuthConfig;
use recipebook::db::mock::MockDb;
use recipebook::db::Db;
use recipebook::environment::Environment;
use recipebook::invite::is_valid_code;
use recipebook::normalization::normalize_name;
use recipebook::recipe::{Category, Difficulty, Ingredient, Recipe, RecipeDetails, Step};
use recipebook::routes::make_routes;
use recipebook::urls::Urls;
use recipebook::user::{Registration, User, UserRole};

struct TestApp {
    db: Arc<MockDb>,
    auth: Arc<AuthConfig>,
    environment: Environment,
}

impl TestApp {
    fn new() -> Self {
        let db = Arc::new(MockDb::new());
        let auth = Arc::new(AuthConfig::new("integration-test-secret"));
        let urls = Arc::new(Urls::new("http://localhost:3000/", "recipes", "groups"));
        let logger = Arc::new(Logger::root(Discard, o!()));

        let environment = Environment::new(logger, db.clone(), auth.clone(), urls);

        TestApp {
            db,
            auth,
            environment,
        }
    }

    fn api(&self) -> BoxedFilter<(impl Reply,)> {
        use warp::Filter;

        make_routes(self.environment.clone()).boxed()
    }

    /// Seeds an administrator account directly and returns a token for
    /// it.
    async fn seed_admin(&self) -> String {
        let registration = Registration {
            name: "Admin".to_owned(),
            email: format!("admin-{}@example.com", uuid::Uuid::new_v4()),
            password: "admin-password".to_owned(),
            bio: None,
            profile_picture: None,
        };
        let user = User::create(
            registration,
            "unused-hash".to_owned(),
            UserRole::Admin,
            time::OffsetDateTime::now_utc(),
        );
        let token = self.auth.issue_token(&user.id).expect("issue admin token");
        self.db.insert_user(user).await.expect("seed admin");

        token
    }
}

async fn get<R>(api: &BoxedFilter<(R,)>, path: &str, token: &str) -> (StatusCode, Value)
where
    R: Reply + Send + 'static,
{
    let response = warp::test::request()
        .method("GET")
        .path(path)
        .header("authorization", format!("Bearer {}", token))
        .reply(api)
        .await;

    (response.status(), parse(response.body()))
}

async fn send_json<R, B>(
    api: &BoxedFilter<(R,)>,
    method: &str,
    path: &str,
    token: Option<&str>,
    body: &B,
) -> (StatusCode, Value)
where
    R: Reply + Send + 'static,
    B: Serialize,
{
    let mut request = warp::test::request().method(method).path(path).json(body);
    if let Some(token) = token {
        request = request.header("authorization", format!("Bearer {}", token));
    }

    let response = request.reply(api).await;
    (response.status(), parse(response.body()))
}

async fn delete<R>(api: &BoxedFilter<(R,)>, path: &str, token: &str) -> StatusCode
where
    R: Reply + Send + 'static,
{
    warp::test::request()
        .method("DELETE")
        .path(path)
        .header("authorization", format!("Bearer {}", token))
        .reply(api)
        .await
        .status()
}

fn parse(body: &Bytes) -> Value {
    if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(body).expect("parse JSON body")
    }
}

fn registration(name: &str, email: &str) -> Value {
    json!({
        "name": name,
        "email": email,
        "password": "secret-password",
    })
}

/// Registers a user through the API, returning their token and ID.
async fn register<R>(api: &BoxedFilter<(R,)>, name: &str, email: &str) -> (String, String)
where
    R: Reply + Send + 'static,
{
    let (status, body) =
        send_json(api, "POST", "/users/register", None, &registration(name, email)).await;
    assert_eq!(status, StatusCode::CREATED, "register {}: {}", email, body);

    (
        body["token"].as_str().expect("token").to_owned(),
        body["user"]["id"].as_str().expect("user ID").to_owned(),
    )
}

fn group_details(name: &str, is_private: bool) -> Value {
    json!({
        "name": name,
        "description": "A group for testing purposes",
        "isPrivate": is_private,
    })
}

async fn create_group<R>(
    api: &BoxedFilter<(R,)>,
    token: &str,
    name: &str,
    is_private: bool,
) -> Value
where
    R: Reply + Send + 'static,
{
    let (status, body) = send_json(
        api,
        "POST",
        "/groups",
        Some(token),
        &group_details(name, is_private),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "create group {}: {}", name, body);

    body
}

fn recipe_details(title: &str) -> RecipeDetails {
    RecipeDetails {
        title: title.to_owned(),
        description: "A dish assembled for the test kitchen".to_owned(),
        ingredients: vec![Ingredient {
            name: "Salt".to_owned(),
            quantity: "1".to_owned(),
            unit: Some("tsp".to_owned()),
        }],
        steps: vec![Step {
            number: 1,
            description: "Combine everything".to_owned(),
        }],
        prep_time: 10,
        cook_time: 20,
        servings: 2,
        difficulty: Difficulty::Easy,
        category: Category::Dinner,
        tags: None,
        image: None,
        group: None,
        is_private: None,
    }
}

fn recipe_body(title: &str) -> Value {
    json!({
        "title": title,
        "description": "A dish assembled for the test kitchen",
        "ingredients": [{ "name": "Salt", "quantity": "1", "unit": "tsp" }],
        "steps": [{ "number": 1, "description": "Combine everything" }],
        "prepTime": 10,
        "cookTime": 20,
        "servings": 2,
        "difficulty": "Easy",
        "category": "Dinner",
    })
}

#[tokio::test]
async fn registration_and_login() {
    let app = TestApp::new();
    let api = app.api();

    let (status, body) = send_json(
        &api,
        "POST",
        "/users/register",
        None,
        &registration("Ana", "ana@example.com"),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(body["token"].is_string());
    assert_eq!(body["user"]["email"], "ana@example.com");
    assert!(body["user"]["passwordHash"].is_null());

    // Same email again, case-insensitively.
    let (status, body) = send_json(
        &api,
        "POST",
        "/users/register",
        None,
        &registration("Ana", "Ana@Example.COM"),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "A user with this email already exists");

    let (status, _) = send_json(
        &api,
        "POST",
        "/users/login",
        None,
        &json!({ "email": "ana@example.com", "password": "wrong-password" }),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = send_json(
        &api,
        "POST",
        "/users/login",
        None,
        &json!({ "email": "ana@example.com", "password": "secret-password" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["token"].is_string());
}

#[tokio::test]
async fn created_groups_carry_a_location_header() {
    let app = TestApp::new();
    let api = app.api();

    let (token, _) = register(&api, "Ana", "ana@example.com").await;
    let response = warp::test::request()
        .method("POST")
        .path("/groups")
        .header("authorization", format!("Bearer {}", token))
        .json(&group_details("Bakers", false))
        .reply(&api)
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let id = parse(response.body())["id"].as_str().expect("ID").to_owned();
    let location = response
        .headers()
        .get("location")
        .expect("location header")
        .to_str()
        .expect("location header value");
    assert_eq!(location, format!("http://localhost:3000/groups/{}", id));
}

#[tokio::test]
async fn authentication_is_required() {
    let app = TestApp::new();
    let api = app.api();

    let response = warp::test::request()
        .method("GET")
        .path("/recipes")
        .reply(&api)
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        parse(response.body())["message"],
        "Authentication required"
    );

    let (status, body) = get(&api, "/recipes", "not-a-real-token").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Invalid token");
}

#[tokio::test]
async fn profile_round_trip() {
    let app = TestApp::new();
    let api = app.api();
    let (token, id) = register(&api, "Ana", "ana@example.com").await;

    let (status, body) = get(&api, "/users/profile", &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], id.as_str());
    assert_eq!(body["name"], "Ana");

    let (status, body) = send_json(
        &api,
        "PUT",
        "/users/profile",
        Some(&token),
        &json!({ "bio": "Home cook", "name": "Ana María" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["bio"], "Home cook");
    // Names come back decomposed (NFD).
    assert_eq!(body["name"], normalize_name("Ana María"));
}

#[tokio::test]
async fn admin_endpoints_are_gated() {
    let app = TestApp::new();
    let api = app.api();
    let (token, _) = register(&api, "Ana", "ana@example.com").await;
    let admin_token = app.seed_admin().await;

    let (status, body) = get(&api, "/users", &token).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "Administrator access only");

    let (status, body) = get(&api, "/users", &admin_token).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.as_array().expect("user list").len() >= 2);

    // Administrators may create accounts with an explicit role.
    let (status, body) = send_json(
        &api,
        "POST",
        "/users/admin/register",
        Some(&admin_token),
        &json!({
            "name": "Mod",
            "email": "mod@example.com",
            "password": "mod-password",
            "role": "admin",
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["role"], "admin");
}

#[tokio::test]
async fn group_lifecycle_with_moderation() {
    let app = TestApp::new();
    let api = app.api();
    let (owner, _) = register(&api, "Owner", "owner@example.com").await;
    let (stranger, _) = register(&api, "Stranger", "stranger@example.com").await;
    let admin_token = app.seed_admin().await;

    let group = create_group(&api, &owner, "Slow cookers", true).await;
    let id = group["id"].as_str().expect("group ID");
    assert_eq!(group["moderationStatus"], "pending");
    assert!(is_valid_code(group["inviteCode"].as_str().expect("code")));

    // Pending and private: hidden from strangers, visible to the owner.
    let (status, body) = get(&api, &format!("/groups/{}", id), &stranger).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "You do not have access to this group");
    let (status, _) = get(&api, &format!("/groups/{}", id), &owner).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = get(&api, "/groups/moderation/pending", &admin_token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().expect("pending groups").len(), 1);

    let (status, body) = send_json(
        &api,
        "POST",
        &format!("/groups/moderation/{}/approve", id),
        Some(&admin_token),
        &json!({}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["moderationStatus"], "approved");

    // Still private, so still members-only.
    let (status, _) = get(&api, &format!("/groups/{}", id), &stranger).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // A metadata edit by the owner goes back through moderation.
    let (status, body) = send_json(
        &api,
        "PUT",
        &format!("/groups/{}", id),
        Some(&owner),
        &json!({ "description": "Low and slow, every weekend" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["moderationStatus"], "pending");
}

#[tokio::test]
async fn rejected_groups_record_a_reason() {
    let app = TestApp::new();
    let api = app.api();
    let (owner, _) = register(&api, "Owner", "owner@example.com").await;
    let admin_token = app.seed_admin().await;

    let group = create_group(&api, &owner, "Spam central", false).await;
    let id = group["id"].as_str().expect("group ID");

    let (status, body) = send_json(
        &api,
        "POST",
        &format!("/groups/moderation/{}/reject", id),
        Some(&admin_token),
        &json!({ "reason": "Off-topic" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["moderationStatus"], "rejected");
    assert_eq!(body["rejectionReason"], "Off-topic");

    // No reason given defaults to the standard one.
    let group = create_group(&api, &owner, "More spam", false).await;
    let id = group["id"].as_str().expect("group ID");
    let (_, body) = send_json(
        &api,
        "POST",
        &format!("/groups/moderation/{}/reject", id),
        Some(&admin_token),
        &json!({}),
    )
    .await;
    assert_eq!(
        body["rejectionReason"],
        "Does not comply with the platform's content policies"
    );

    // A bodyless rejection gets the same default.
    let group = create_group(&api, &owner, "Even more spam", false).await;
    let id = group["id"].as_str().expect("group ID");
    let response = warp::test::request()
        .method("POST")
        .path(&format!("/groups/moderation/{}/reject", id))
        .header("authorization", format!("Bearer {}", admin_token))
        .reply(&api)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        parse(response.body())["rejectionReason"],
        "Does not comply with the platform's content policies"
    );
}

#[tokio::test]
async fn public_group_join_is_immediate() {
    let app = TestApp::new();
    let api = app.api();
    let (owner, _) = register(&api, "Owner", "owner@example.com").await;
    let (joiner, _) = register(&api, "Joiner", "joiner@example.com").await;

    let group = create_group(&api, &owner, "Open kitchen", false).await;
    let code = group["inviteCode"].as_str().expect("code");

    let (status, body) = send_json(
        &api,
        "POST",
        &format!("/groups/invite/{}/join", code),
        Some(&joiner),
        &json!({}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "You have joined the group");

    let (status, body) = get(&api, "/groups/user", &joiner).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().expect("own groups").len(), 1);

    // Joining twice is rejected.
    let (status, body) = send_json(
        &api,
        "POST",
        &format!("/groups/invite/{}/join", code),
        Some(&joiner),
        &json!({}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "You are already a member of this group");
}

#[tokio::test]
async fn private_group_join_requires_approval() {
    let app = TestApp::new();
    let api = app.api();
    let (owner, _) = register(&api, "Owner", "owner@example.com").await;
    let (first, first_id) = register(&api, "First", "first@example.com").await;
    let (second, second_id) = register(&api, "Second", "second@example.com").await;

    let group = create_group(&api, &owner, "Secret supper club", true).await;
    let id = group["id"].as_str().expect("group ID");
    let code = group["inviteCode"].as_str().expect("code");

    for token in &[&first, &second] {
        let (status, body) = send_json(
            &api,
            "POST",
            &format!("/groups/invite/{}/join", code),
            Some(token),
            &json!({}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Your request to join is pending approval");
    }

    // Requesters are not members and cannot decide on requests.
    let (status, _) = send_json(
        &api,
        "POST",
        &format!("/groups/{}/approve/{}", id, second_id),
        Some(&first),
        &json!({}),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send_json(
        &api,
        "POST",
        &format!("/groups/{}/approve/{}", id, first_id),
        Some(&owner),
        &json!({}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["members"].as_array().expect("members").len(), 2);
    assert_eq!(body["pendingRequests"].as_array().expect("pending").len(), 1);

    let (status, body) = send_json(
        &api,
        "POST",
        &format!("/groups/{}/reject/{}", id, second_id),
        Some(&owner),
        &json!({}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["pendingRequests"]
        .as_array()
        .expect("pending")
        .is_empty());
    assert_eq!(body["members"].as_array().expect("members").len(), 2);

    // The approved member can now view the private group; the rejected
    // one still cannot.
    let (status, _) = get(&api, &format!("/groups/{}", id), &first).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = get(&api, &format!("/groups/{}", id), &second).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn invite_codes_are_distinct() {
    let app = TestApp::new();
    let api = app.api();
    let (owner, _) = register(&api, "Owner", "owner@example.com").await;

    let first = create_group(&api, &owner, "First group", false).await;
    let second = create_group(&api, &owner, "Second group", false).await;

    let first_code = first["inviteCode"].as_str().expect("code");
    let second_code = second["inviteCode"].as_str().expect("code");
    assert_ne!(first_code, second_code);
    assert!(is_valid_code(first_code));
    assert!(is_valid_code(second_code));

    // Looking up a code annotates the caller's standing with the group.
    let (status, body) = get(&api, &format!("/groups/invite/{}", first_code), &owner).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "First group");
    assert_eq!(body["isMember"], true);
    assert_eq!(body["hasPendingRequest"], false);

    let (visitor, _) = register(&api, "Visitor", "visitor@example.com").await;
    let (status, body) = get(&api, &format!("/groups/invite/{}", first_code), &visitor).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["isMember"], false);
    assert_eq!(body["hasPendingRequest"], false);
}

#[tokio::test]
async fn role_changes_are_owner_only() {
    let app = TestApp::new();
    let api = app.api();
    let (owner, _) = register(&api, "Owner", "owner@example.com").await;
    let (member, member_id) = register(&api, "Member", "member@example.com").await;
    let admin_token = app.seed_admin().await;

    let group = create_group(&api, &owner, "Role testers", false).await;
    let id = group["id"].as_str().expect("group ID");
    let code = group["inviteCode"].as_str().expect("code");

    send_json(
        &api,
        "POST",
        &format!("/groups/invite/{}/join", code),
        Some(&member),
        &json!({}),
    )
    .await;

    // Neither the member themselves nor a platform administrator may
    // change roles.
    for token in &[&member, &admin_token] {
        let (status, body) = send_json(
            &api,
            "PUT",
            &format!("/groups/{}/members/{}/role", id, member_id),
            Some(token),
            &json!({ "role": "admin" }),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["message"], "Only the owner can change member roles");
    }

    let (status, body) = send_json(
        &api,
        "PUT",
        &format!("/groups/{}/members/{}/role", id, member_id),
        Some(&owner),
        &json!({ "role": "admin" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let members = body["members"].as_array().expect("members");
    let promoted = members
        .iter()
        .find(|m| m["user"] == member_id.as_str())
        .expect("promoted member");
    assert_eq!(promoted["role"], "admin");
}

#[tokio::test]
async fn members_can_leave_but_owners_cannot() {
    let app = TestApp::new();
    let api = app.api();
    let (owner, owner_id) = register(&api, "Owner", "owner@example.com").await;
    let (member, member_id) = register(&api, "Member", "member@example.com").await;

    let group = create_group(&api, &owner, "Leavers", false).await;
    let id = group["id"].as_str().expect("group ID");
    let code = group["inviteCode"].as_str().expect("code");

    send_json(
        &api,
        "POST",
        &format!("/groups/invite/{}/join", code),
        Some(&member),
        &json!({}),
    )
    .await;

    let response = warp::test::request()
        .method("DELETE")
        .path(&format!("/groups/{}/members/{}", id, member_id))
        .header("authorization", format!("Bearer {}", member))
        .reply(&api)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = parse(response.body());
    assert_eq!(body["members"].as_array().expect("members").len(), 1);

    // Leaving works for group admins too, though only the owner could
    // remove them.
    let (admin, admin_id) = register(&api, "Helper", "helper@example.com").await;
    send_json(
        &api,
        "POST",
        &format!("/groups/invite/{}/join", code),
        Some(&admin),
        &json!({}),
    )
    .await;
    send_json(
        &api,
        "PUT",
        &format!("/groups/{}/members/{}/role", id, admin_id),
        Some(&owner),
        &json!({ "role": "admin" }),
    )
    .await;
    let response = warp::test::request()
        .method("DELETE")
        .path(&format!("/groups/{}/members/{}", id, admin_id))
        .header("authorization", format!("Bearer {}", admin))
        .reply(&api)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = parse(response.body());
    assert_eq!(body["members"].as_array().expect("members").len(), 1);

    let response = warp::test::request()
        .method("DELETE")
        .path(&format!("/groups/{}/members/{}", id, owner_id))
        .header("authorization", format!("Bearer {}", owner))
        .reply(&api)
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        parse(response.body())["message"],
        "The owner cannot be removed from the group"
    );
}

#[tokio::test]
async fn recipe_moderation_flow() {
    let app = TestApp::new();
    let api = app.api();
    let (author, _) = register(&api, "Author", "author@example.com").await;
    let (stranger, _) = register(&api, "Stranger", "stranger@example.com").await;
    let admin_token = app.seed_admin().await;

    let (status, body) = send_json(
        &api,
        "POST",
        "/recipes",
        Some(&author),
        &recipe_body("Tortilla de patatas"),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["moderationStatus"], "pending");
    let id = body["id"].as_str().expect("recipe ID").to_owned();

    // Pending recipes are only visible to their author and admins.
    let (status, _) = get(&api, &format!("/recipes/{}", id), &stranger).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = get(&api, &format!("/recipes/{}", id), &author).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = get(&api, "/recipes", &stranger).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["totalRecipes"], 0);

    let (status, body) = get(&api, "/recipes/moderation/pending", &admin_token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().expect("pending recipes").len(), 1);

    let (status, body) = send_json(
        &api,
        "POST",
        &format!("/recipes/moderation/{}/approve", id),
        Some(&admin_token),
        &json!({}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["moderationStatus"], "approved");

    let (status, _) = get(&api, &format!("/recipes/{}", id), &stranger).await;
    assert_eq!(status, StatusCode::OK);
    let (_, body) = get(&api, "/recipes", &stranger).await;
    assert_eq!(body["totalRecipes"], 1);

    // An author edit sends it back through moderation.
    let (status, body) = send_json(
        &api,
        "PUT",
        &format!("/recipes/{}", id),
        Some(&author),
        &recipe_body("Tortilla de patatas con cebolla"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["moderationStatus"], "pending");
    assert_eq!(body["title"], "Tortilla de patatas con cebolla");

    // Only the author or an admin may modify it.
    let (status, body) = send_json(
        &api,
        "PUT",
        &format!("/recipes/{}", id),
        Some(&stranger),
        &recipe_body("Hijacked recipe"),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "You cannot modify this recipe");
}

#[tokio::test]
async fn recipe_listing_paginates() {
    let app = TestApp::new();
    let api = app.api();
    let (token, _) = register(&api, "Reader", "reader@example.com").await;

    // Seed approved recipes directly; admin-authored content skips
    // moderation.
    let admin = uuid::Uuid::new_v4();
    for number in 0..25i64 {
        let recipe = Recipe::create(
            recipe_details(&format!("Recipe number {}", number)),
            admin,
            UserRole::Admin,
            time::OffsetDateTime::now_utc() + time::Duration::seconds(number),
        );
        app.db.insert_recipe(recipe).await.expect("seed recipe");
    }

    let (status, body) = get(&api, "/recipes?page=2&limit=10", &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["recipes"].as_array().expect("recipes").len(), 10);
    assert_eq!(body["totalRecipes"], 25);
    assert_eq!(body["totalPages"], 3);
    assert_eq!(body["currentPage"], 2);

    let (_, body) = get(&api, "/recipes?page=3&limit=10", &token).await;
    assert_eq!(body["recipes"].as_array().expect("recipes").len(), 5);

    let (status, _) = get(&api, "/recipes?page=0", &token).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Sorting by an unknown field is rejected.
    let (status, _) = get(&api, "/recipes?sort=author", &token).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn recipe_search_ranks_title_matches_first() {
    let app = TestApp::new();
    let api = app.api();
    let (token, _) = register(&api, "Cook", "cook@example.com").await;

    let admin = uuid::Uuid::new_v4();
    let mut in_description = recipe_details("Weeknight dinner");
    in_description.description = "A quick paella for weeknights".to_owned();
    let mut in_title = recipe_details("Paella valenciana");
    in_title.category = Category::Lunch;

    for details in vec![in_description, in_title] {
        let recipe = Recipe::create(
            details,
            admin,
            UserRole::Admin,
            time::OffsetDateTime::now_utc(),
        );
        app.db.insert_recipe(recipe).await.expect("seed recipe");
    }

    let (status, body) = get(&api, "/recipes/search", &token).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "At least one search criterion is required");

    let (status, body) = get(&api, "/recipes/search?q=paella", &token).await;
    assert_eq!(status, StatusCode::OK);
    let results = body.as_array().expect("search results");
    assert_eq!(results.len(), 2);
    assert_eq!(results[0]["title"], "Paella valenciana");

    let (_, body) = get(&api, "/recipes/search?q=paella&category=Lunch", &token).await;
    assert_eq!(body.as_array().expect("filtered results").len(), 1);

    let (status, _) = get(&api, "/recipes/search?difficulty=Impossible", &token).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn group_search_requires_a_query() {
    let app = TestApp::new();
    let api = app.api();
    let (owner, _) = register(&api, "Owner", "owner@example.com").await;
    let admin_token = app.seed_admin().await;

    let group = create_group(&api, &owner, "Bread bakers", false).await;
    let id = group["id"].as_str().expect("group ID");
    send_json(
        &api,
        "POST",
        &format!("/groups/moderation/{}/approve", id),
        Some(&admin_token),
        &json!({}),
    )
    .await;

    let (status, body) = get(&api, "/groups/search", &owner).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "A search query is required");

    let (status, body) = get(&api, "/groups/search?q=bread", &owner).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().expect("groups").len(), 1);
}

#[tokio::test]
async fn sharing_into_a_group_requires_membership() {
    let app = TestApp::new();
    let api = app.api();
    let (owner, _) = register(&api, "Owner", "owner@example.com").await;
    let (outsider, _) = register(&api, "Outsider", "outsider@example.com").await;

    let group = create_group(&api, &owner, "Members only", true).await;
    let id = group["id"].as_str().expect("group ID");

    let mut body = recipe_body("Group recipe");
    body["group"] = json!(id);

    let (status, response) = send_json(&api, "POST", "/recipes", Some(&outsider), &body).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(
        response["message"],
        "You must be a member of the group to share recipes in it"
    );

    let (status, _) = send_json(&api, "POST", "/recipes", Some(&owner), &body).await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn deleting_a_user_cascades() {
    let app = TestApp::new();
    let api = app.api();
    let (owner, owner_id) = register(&api, "Owner", "owner@example.com").await;
    let (other, _) = register(&api, "Other", "other@example.com").await;
    let admin_token = app.seed_admin().await;

    // The doomed user creates a group and a recipe, and joins another
    // group.
    let own_group = create_group(&api, &owner, "Doomed group", false).await;
    let other_group = create_group(&api, &other, "Surviving group", false).await;
    let code = other_group["inviteCode"].as_str().expect("code");
    send_json(
        &api,
        "POST",
        &format!("/groups/invite/{}/join", code),
        Some(&owner),
        &json!({}),
    )
    .await;
    let (_, recipe) = send_json(
        &api,
        "POST",
        "/recipes",
        Some(&owner),
        &recipe_body("Doomed recipe"),
    )
    .await;

    let status = delete(&api, &format!("/users/{}", owner_id), &admin_token).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    // Their group and recipe are gone, and their membership elsewhere is
    // withdrawn.
    let own_group_id = own_group["id"].as_str().expect("group ID");
    let (status, _) = get(&api, &format!("/groups/{}", own_group_id), &admin_token).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let recipe_id = recipe["id"].as_str().expect("recipe ID");
    let (status, _) = get(&api, &format!("/recipes/{}", recipe_id), &admin_token).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let other_group_id = other_group["id"].as_str().expect("group ID");
    let (_, body) = get(&api, &format!("/groups/{}", other_group_id), &admin_token).await;
    assert_eq!(body["members"].as_array().expect("members").len(), 1);

    // The deleted user's token no longer works.
    let (status, _) = get(&api, "/users/profile", &owner).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
