use crate::core::time::primitive_now_utc;
use crate::db::types::Role;
use crate::test_support::{self, QuizFixture};
use axum::http::{Method, StatusCode};
use serde_json::json;
use time::Duration;
use tower::ServiceExt;

const TOKEN_HEADER: &str = "x-attempt-token";

#[tokio::test]
async fn start_fetch_submit_and_reveal() {
    let ctx = test_support::setup_test_context().await;
    let pool = ctx.state.db();
    let teacher = test_support::insert_teacher(pool, "teacher").await;
    let student = test_support::insert_student(pool, "student").await;
    let subject = test_support::insert_subject(pool, "Algebra").await;
    let quiz = test_support::insert_quiz(
        pool,
        QuizFixture { password: Some("open-sesame"), ..QuizFixture::open(&teacher.id, &subject.id) },
    )
    .await;
    let (first, first_options) = test_support::insert_question(pool, &quiz.id, 3, &["a", "b"]).await;
    let (second, second_options) =
        test_support::insert_question(pool, &quiz.id, 4, &["c", "d"]).await;
    let token = test_support::bearer_token(&student.id, Role::Student, ctx.state.settings());
    let teacher_token = test_support::bearer_token(&teacher.id, Role::Teacher, ctx.state.settings());

    let start_uri = format!("/student/quizzes/{}/start", quiz.id);
    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            &start_uri,
            Some(&token),
            Some(json!({"password": "guess"})),
        ))
        .await
        .expect("start with wrong password");
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            &start_uri,
            Some(&token),
            Some(json!({"password": "open-sesame"})),
        ))
        .await
        .expect("start");
    let status = response.status();
    let started = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::OK, "response: {started}");
    assert_eq!(started["quiz_id"], quiz.id.as_str());
    assert_eq!(started["resumed"], false);
    let remaining = started["remaining_seconds"].as_i64().expect("remaining");
    assert!((590..=600).contains(&remaining), "remaining: {remaining}");
    let attempt_token = started["attempt_token"].as_str().expect("token").to_string();

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            &start_uri,
            Some(&token),
            Some(json!({"password": "open-sesame"})),
        ))
        .await
        .expect("restart");
    let restarted = test_support::read_json(response).await;
    assert_eq!(restarted["attempt_token"], attempt_token.as_str());
    assert_eq!(restarted["expires_at"], started["expires_at"]);
    assert_eq!(restarted["resumed"], true);

    let questions_uri = format!("/student/questions/{}", quiz.id);
    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(Method::GET, &questions_uri, Some(&token), None))
        .await
        .expect("questions without attempt token");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = test_support::read_json(response).await;
    assert_eq!(body["code"], "invalid_attempt_token");

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::request_with_headers(
            Method::GET,
            &questions_uri,
            Some(&token),
            &[(TOKEN_HEADER, &attempt_token)],
            None,
        ))
        .await
        .expect("questions");
    let status = response.status();
    let fetched = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::OK, "response: {fetched}");
    assert_eq!(fetched["questions"][0]["id"], first.id.as_str());
    assert_eq!(fetched["questions"][1]["id"], second.id.as_str());
    assert!(!fetched.to_string().contains("is_correct"));

    let submit_uri = format!("/student/quizzes/{}/submit", quiz.id);
    let answers = json!({
        "answers": [
            {"question_id": first.id, "option_id": first_options[0].id},
            {"question_id": second.id, "option_id": second_options[0].id}
        ]
    });
    let response = ctx
        .app
        .clone()
        .oneshot(test_support::request_with_headers(
            Method::POST,
            &submit_uri,
            Some(&token),
            &[(TOKEN_HEADER, &attempt_token)],
            Some(answers.clone()),
        ))
        .await
        .expect("submit");
    let status = response.status();
    let scored = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::OK, "response: {scored}");
    assert_eq!(scored["total_points"], 7);
    assert_eq!(scored["max_points"], 7);
    assert_eq!(scored["passed"], true);
    assert_eq!(scored["results"].as_array().map(Vec::len), Some(2));

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::request_with_headers(
            Method::POST,
            &submit_uri,
            Some(&token),
            &[(TOKEN_HEADER, &attempt_token)],
            Some(answers),
        ))
        .await
        .expect("second submit");
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body = test_support::read_json(response).await;
    assert_eq!(body["code"], "already_submitted");

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            &start_uri,
            Some(&token),
            Some(json!({"password": "open-sesame"})),
        ))
        .await
        .expect("start after submit");
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body = test_support::read_json(response).await;
    assert_eq!(body["code"], "already_attempted");

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::GET,
            &format!("/student/solutions/{}", quiz.id),
            Some(&token),
            None,
        ))
        .await
        .expect("solutions");
    let status = response.status();
    let solutions = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::OK, "response: {solutions}");
    assert_eq!(solutions["score"], 7);
    assert_eq!(solutions["finish_reason"], "submitted");
    assert_eq!(solutions["questions"][0]["correct_option_id"], first_options[0].id.as_str());
    assert_eq!(solutions["questions"][1]["selected_option_id"], second_options[0].id.as_str());

    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::GET,
            &format!("/quizzes/{}/attempts", quiz.id),
            Some(&teacher_token),
            None,
        ))
        .await
        .expect("teacher attempts");
    let status = response.status();
    let attempts = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::OK, "response: {attempts}");
    assert_eq!(attempts[0]["student_username"], "student");
    assert_eq!(attempts[0]["status"], "finished");
    assert_eq!(attempts[0]["passed"], true);
    assert!(attempts[0].get("attempt_token").is_none());
}

#[tokio::test]
async fn start_outside_window_and_unknown_quiz() {
    let ctx = test_support::setup_test_context().await;
    let pool = ctx.state.db();
    let teacher = test_support::insert_teacher(pool, "teacher").await;
    let student = test_support::insert_student(pool, "student").await;
    let subject = test_support::insert_subject(pool, "Algebra").await;
    let now = primitive_now_utc();
    let future = test_support::insert_quiz(
        pool,
        QuizFixture {
            start_time: now + Duration::hours(1),
            end_time: now + Duration::hours(2),
            ..QuizFixture::open(&teacher.id, &subject.id)
        },
    )
    .await;
    let token = test_support::bearer_token(&student.id, Role::Student, ctx.state.settings());

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            &format!("/student/quizzes/{}/start", future.id),
            Some(&token),
            None,
        ))
        .await
        .expect("start early");
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body = test_support::read_json(response).await;
    assert_eq!(body["code"], "out_of_window");

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            &format!("/student/quizzes/{}/start", uuid::Uuid::new_v4()),
            Some(&token),
            None,
        ))
        .await
        .expect("start unknown");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = test_support::read_json(response).await;
    assert_eq!(body["code"], "not_found");

    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::GET,
            &format!("/student/solutions/{}", future.id),
            Some(&token),
            None,
        ))
        .await
        .expect("solutions without attempt");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn attempt_token_is_bound_to_its_student() {
    let ctx = test_support::setup_test_context().await;
    let pool = ctx.state.db();
    let teacher = test_support::insert_teacher(pool, "teacher").await;
    let owner = test_support::insert_student(pool, "owner").await;
    let other = test_support::insert_student(pool, "other").await;
    let subject = test_support::insert_subject(pool, "Algebra").await;
    let quiz = test_support::insert_quiz(pool, QuizFixture::open(&teacher.id, &subject.id)).await;
    test_support::insert_question(pool, &quiz.id, 3, &["a", "b"]).await;
    let owner_token = test_support::bearer_token(&owner.id, Role::Student, ctx.state.settings());
    let other_token = test_support::bearer_token(&other.id, Role::Student, ctx.state.settings());
    let teacher_token = test_support::bearer_token(&teacher.id, Role::Teacher, ctx.state.settings());

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            &format!("/student/quizzes/{}/start", quiz.id),
            Some(&owner_token),
            None,
        ))
        .await
        .expect("start");
    assert_eq!(response.status(), StatusCode::OK);
    let started = test_support::read_json(response).await;
    let attempt_token = started["attempt_token"].as_str().expect("token").to_string();

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::request_with_headers(
            Method::POST,
            &format!("/student/quizzes/{}/submit", quiz.id),
            Some(&other_token),
            &[(TOKEN_HEADER, &attempt_token)],
            Some(json!({"answers": {}})),
        ))
        .await
        .expect("foreign submit");
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::GET,
            &format!("/student/solutions/{}", quiz.id),
            Some(&owner_token),
            None,
        ))
        .await
        .expect("solutions before submit");
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            &format!("/student/quizzes/{}/start", quiz.id),
            Some(&teacher_token),
            None,
        ))
        .await
        .expect("teacher start");
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = ctx
        .app
        .oneshot(test_support::request_with_headers(
            Method::GET,
            &format!("/student/questions/{}", quiz.id),
            Some(&owner_token),
            &[(TOKEN_HEADER, "not-a-real-token")],
            None,
        ))
        .await
        .expect("bogus token");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = test_support::read_json(response).await;
    assert_eq!(body["code"], "invalid_attempt_token");
}
