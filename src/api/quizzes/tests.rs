use std::collections::HashMap;

use crate::db::types::Role;
use crate::repositories;
use crate::services::attempts;
use crate::test_support::{self, QuizFixture};
use axum::http::{Method, StatusCode};
use serde_json::{json, Value};
use tower::ServiceExt;

fn quiz_payload(subject_id: &str) -> Value {
    json!({
        "title": "Linear algebra midterm",
        "description": "Vectors and matrices",
        "password": "open-sesame",
        "subject_id": subject_id,
        "time_limit_minutes": 10,
        "passing_score": 5,
        "start_time": "2020-01-01T00:00:00Z",
        "end_time": "2099-01-01T00:00:00Z",
        "questions": [
            {
                "text": "det(I)?",
                "points": 3,
                "options": [{"text": "1", "is_correct": true}, {"text": "0"}]
            },
            {
                "text": "rank of the zero matrix?",
                "points": 4,
                "options": [{"text": "0", "is_correct": true}, {"text": "1"}, {"text": "n"}]
            }
        ]
    })
}

#[tokio::test]
async fn teacher_creates_quiz_and_public_view_hides_key() {
    let ctx = test_support::setup_test_context().await;
    let teacher = test_support::insert_teacher(ctx.state.db(), "teacher").await;
    let subject = test_support::insert_subject(ctx.state.db(), "Algebra").await;
    let token = test_support::bearer_token(&teacher.id, Role::Teacher, ctx.state.settings());

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            "/quizzes",
            Some(&token),
            Some(quiz_payload(&subject.id)),
        ))
        .await
        .expect("create quiz");
    let status = response.status();
    let created = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::CREATED, "response: {created}");
    assert_eq!(created["teacher_id"], teacher.id.as_str());
    assert_eq!(created["has_password"], true);
    assert_eq!(created["max_points"], 7);
    assert_eq!(created["questions"][0]["options"][0]["is_correct"], true);
    assert_eq!(created["questions"][1]["position"], 1);
    assert!(created.get("password").is_none());
    assert!(created.get("password_hash").is_none());
    let quiz_id = created["id"].as_str().expect("quiz id").to_string();

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::GET,
            &format!("/quizzes1/{quiz_id}"),
            None,
            None,
        ))
        .await
        .expect("public quiz");
    assert_eq!(response.status(), StatusCode::OK);
    let public = test_support::read_json(response).await;
    assert_eq!(public["question_count"], 2);
    assert_eq!(public["has_password"], true);
    assert!(public.get("questions").is_none());
    assert!(!public.to_string().contains("argon2"));

    let response = ctx
        .app
        .oneshot(test_support::json_request(Method::GET, "/quizzes", None, None))
        .await
        .expect("list quizzes");
    assert_eq!(response.status(), StatusCode::OK);
    let listed = test_support::read_json(response).await;
    assert_eq!(listed.as_array().map(Vec::len), Some(1));
    assert!(!listed.to_string().contains("is_correct"));
}

#[tokio::test]
async fn quiz_payload_rules_are_enforced() {
    let ctx = test_support::setup_test_context().await;
    let teacher = test_support::insert_teacher(ctx.state.db(), "teacher").await;
    let subject = test_support::insert_subject(ctx.state.db(), "Algebra").await;
    let token = test_support::bearer_token(&teacher.id, Role::Teacher, ctx.state.settings());

    let mut two_correct = quiz_payload(&subject.id);
    two_correct["questions"][0]["options"][1]["is_correct"] = json!(true);

    let mut inverted_window = quiz_payload(&subject.id);
    inverted_window["end_time"] = json!("2019-01-01T00:00:00Z");

    let mut zero_points = quiz_payload(&subject.id);
    zero_points["questions"][0]["points"] = json!(0);

    let unknown_subject = quiz_payload(&uuid::Uuid::new_v4().to_string());

    for payload in [two_correct, inverted_window, zero_points, unknown_subject] {
        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::POST,
                "/quizzes",
                Some(&token),
                Some(payload),
            ))
            .await
            .expect("create quiz");
        let status = response.status();
        let body = test_support::read_json(response).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY, "response: {body}");
        assert_eq!(body["code"], "validation_error");
    }

    let response = ctx
        .app
        .oneshot(
            axum::http::Request::builder()
                .method(Method::POST)
                .uri("/quizzes")
                .header("authorization", format!("Bearer {token}"))
                .header("content-type", "application/json")
                .body(axum::body::Body::from("{not json"))
                .expect("request"),
        )
        .await
        .expect("malformed quiz");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn other_teacher_cannot_modify_quiz() {
    let ctx = test_support::setup_test_context().await;
    let pool = ctx.state.db();
    let author = test_support::insert_teacher(pool, "author").await;
    let intruder = test_support::insert_teacher(pool, "intruder").await;
    let subject = test_support::insert_subject(pool, "Algebra").await;
    let quiz = test_support::insert_quiz(pool, QuizFixture::open(&author.id, &subject.id)).await;
    let (question, options) = test_support::insert_question(pool, &quiz.id, 3, &["a", "b"]).await;
    let token = test_support::bearer_token(&intruder.id, Role::Teacher, ctx.state.settings());

    let requests = [
        (Method::PUT, format!("/quizzes/{}", quiz.id), Some(json!({"title": "Mine now"}))),
        (Method::DELETE, format!("/quizzes/{}", quiz.id), None),
        (Method::GET, format!("/teacher/quizzes/{}", quiz.id), None),
        (Method::GET, format!("/quizzes/{}/attempts", quiz.id), None),
        (
            Method::POST,
            "/questions".to_string(),
            Some(json!({
                "quiz_id": quiz.id,
                "text": "extra",
                "points": 1,
                "options": [{"text": "x", "is_correct": true}]
            })),
        ),
        (Method::PUT, format!("/questions/{}", question.id), Some(json!({"points": 9}))),
        (Method::DELETE, format!("/questions/{}", question.id), None),
        (
            Method::POST,
            "/options".to_string(),
            Some(json!({"question_id": question.id, "text": "c"})),
        ),
        (Method::PUT, format!("/options/{}", options[1].id), Some(json!({"text": "z"}))),
        (Method::DELETE, format!("/options/{}", options[1].id), None),
    ];

    for (method, uri, body) in requests {
        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(method.clone(), &uri, Some(&token), body))
            .await
            .expect("intruder request");
        let status = response.status();
        let payload = test_support::read_json(response).await;
        assert_eq!(status, StatusCode::FORBIDDEN, "{method} {uri}: {payload}");
        assert_eq!(payload["code"], "forbidden");
    }

    let unchanged = crate::repositories::quizzes::find_by_id(pool, &quiz.id)
        .await
        .expect("load quiz")
        .expect("quiz still exists");
    assert_eq!(unchanged.title, quiz.title);
}

#[tokio::test]
async fn owner_updates_quiz_fields_and_password() {
    let ctx = test_support::setup_test_context().await;
    let pool = ctx.state.db();
    let teacher = test_support::insert_teacher(pool, "teacher").await;
    let subject = test_support::insert_subject(pool, "Algebra").await;
    let quiz = test_support::insert_quiz(
        pool,
        QuizFixture { password: Some("secret"), ..QuizFixture::open(&teacher.id, &subject.id) },
    )
    .await;
    let token = test_support::bearer_token(&teacher.id, Role::Teacher, ctx.state.settings());

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::PUT,
            &format!("/quizzes/{}", quiz.id),
            Some(&token),
            Some(json!({"title": "Renamed", "password": "", "passing_score": 1})),
        ))
        .await
        .expect("update quiz");
    let status = response.status();
    let body = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::OK, "response: {body}");
    assert_eq!(body["title"], "Renamed");
    assert_eq!(body["has_password"], false);
    assert_eq!(body["passing_score"], 1);
    assert_eq!(body["time_limit_minutes"], quiz.time_limit_minutes);

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::PUT,
            &format!("/quizzes/{}", quiz.id),
            Some(&token),
            Some(json!({"end_time": "2000-01-01T00:00"})),
        ))
        .await
        .expect("bad window");
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let response = ctx
        .app
        .oneshot(test_support::json_request(Method::GET, "/teacher/quizzes", Some(&token), None))
        .await
        .expect("own quizzes");
    assert_eq!(response.status(), StatusCode::OK);
    let listed = test_support::read_json(response).await;
    assert_eq!(listed[0]["id"], quiz.id.as_str());
}

#[tokio::test]
async fn correct_option_moves_but_never_disappears() {
    let ctx = test_support::setup_test_context().await;
    let pool = ctx.state.db();
    let teacher = test_support::insert_teacher(pool, "teacher").await;
    let subject = test_support::insert_subject(pool, "Algebra").await;
    let quiz = test_support::insert_quiz(pool, QuizFixture::open(&teacher.id, &subject.id)).await;
    let (question, options) = test_support::insert_question(pool, &quiz.id, 3, &["a", "b"]).await;
    let token = test_support::bearer_token(&teacher.id, Role::Teacher, ctx.state.settings());

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::PUT,
            &format!("/options/{}", options[0].id),
            Some(&token),
            Some(json!({"is_correct": false})),
        ))
        .await
        .expect("unset only correct");
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::DELETE,
            &format!("/options/{}", options[0].id),
            Some(&token),
            None,
        ))
        .await
        .expect("delete correct");
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            "/options",
            Some(&token),
            Some(json!({"question_id": question.id, "text": "c", "is_correct": true})),
        ))
        .await
        .expect("add correct option");
    let status = response.status();
    let added = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::CREATED, "response: {added}");
    assert_eq!(added["position"], 2);

    let stored = repositories::options::list_by_question(pool, &question.id)
        .await
        .expect("options");
    let correct: Vec<_> = stored.iter().filter(|option| option.is_correct).collect();
    assert_eq!(correct.len(), 1);
    assert_eq!(correct[0].id, added["id"].as_str().expect("option id"));

    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::DELETE,
            &format!("/options/{}", options[0].id),
            Some(&token),
            None,
        ))
        .await
        .expect("delete former correct");
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn attempted_quiz_keeps_its_questions_and_options() {
    let ctx = test_support::setup_test_context().await;
    let pool = ctx.state.db();
    let teacher = test_support::insert_teacher(pool, "teacher").await;
    let student = test_support::insert_student(pool, "student").await;
    let subject = test_support::insert_subject(pool, "Algebra").await;
    let quiz = test_support::insert_quiz(pool, QuizFixture::open(&teacher.id, &subject.id)).await;
    let (first, first_options) = test_support::insert_question(pool, &quiz.id, 3, &["a", "b"]).await;
    let (second, second_options) =
        test_support::insert_question(pool, &quiz.id, 4, &["c", "d"]).await;
    let token = test_support::bearer_token(&teacher.id, Role::Teacher, ctx.state.settings());

    let now = crate::core::time::primitive_now_utc();
    let started = attempts::start_attempt(
        pool,
        attempts::StartRequest {
            student_id: &student.id,
            quiz_id: &quiz.id,
            password: None,
            token_bytes: 32,
            now,
        },
    )
    .await
    .expect("start");
    let attempt_token = started.attempt.attempt_token.clone().expect("token");
    let answers = HashMap::from([
        (first.id.clone(), Some(first_options[1].id.clone())),
        (second.id.clone(), Some(second_options[0].id.clone())),
    ]);
    let submitted =
        attempts::submit_attempt(pool, &student.id, &quiz.id, &attempt_token, answers, now)
            .await
            .expect("submit");
    assert_eq!(submitted.result.total_points, 4);

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::DELETE,
            &format!("/options/{}", first_options[1].id),
            Some(&token),
            None,
        ))
        .await
        .expect("delete chosen wrong option");
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body = test_support::read_json(response).await;
    assert_eq!(body["code"], "conflict");

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::DELETE,
            &format!("/questions/{}", second.id),
            Some(&token),
            None,
        ))
        .await
        .expect("delete answered question");
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let err = repositories::questions::delete(pool, &second.id)
        .await
        .expect_err("answer records pin their question");
    let code = err.as_database_error().and_then(|db| db.code()).map(|code| code.into_owned());
    assert_eq!(code.as_deref(), Some("23503"));
    let err = repositories::options::delete(pool, &first_options[1].id)
        .await
        .expect_err("answer records pin their option");
    assert!(err.as_database_error().is_some(), "{err:?}");

    let records =
        repositories::answers::list_by_attempt(pool, &started.attempt.id).await.expect("records");
    assert_eq!(records.len(), 2);
    let first_record =
        records.iter().find(|record| record.question_id == first.id).expect("first record");
    assert_eq!(first_record.selected_option_id.as_deref(), Some(first_options[1].id.as_str()));

    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::DELETE,
            &format!("/quizzes/{}", quiz.id),
            Some(&token),
            None,
        ))
        .await
        .expect("delete quiz");
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    let remaining = repositories::answers::count_by_attempt(pool, &started.attempt.id)
        .await
        .expect("count");
    assert_eq!(remaining, 0);
}
