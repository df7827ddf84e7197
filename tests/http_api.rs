use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tower::ServiceExt;

use mcqgen::config::QuizConfig;
use mcqgen::domain::SchemaTemplate;
use mcqgen::openai::OpenAI;
use mcqgen::routes::build_router;
use mcqgen::state::AppState;

const QUIZ_REPLY: &str = "Here you go!\n```json\n{\"1\": {\"mcq\": \"What do mitochondria make?\", \"options\": {\"a\": \"ATP\", \"b\": \"DNA\", \"c\": \"RNA\", \"d\": \"Fat\"}, \"correct\": \"a\"}}\n```";
const REVIEW_REPLY: &str = "The quiz is simple and clear.";
const BOUNDARY: &str = "mcqgen-test-boundary";

/// Stand-in for `/chat/completions`: a system message means the quiz stage,
/// a lone user message means the review stage. Model "limited" always gets 429.
async fn fake_completions(Json(body): Json<Value>) -> axum::response::Response {
    if body["model"] == "limited" {
        return (
            StatusCode::TOO_MANY_REQUESTS,
            Json(json!({"error": {"message": "Rate limit reached"}})),
        )
            .into_response();
    }
    let first_role = body["messages"][0]["role"].as_str().unwrap_or_default();
    let content = if first_role == "system" { QUIZ_REPLY } else { REVIEW_REPLY };
    Json(json!({
        "choices": [{"message": {"role": "assistant", "content": content}}],
        "usage": {"prompt_tokens": 10, "completion_tokens": 20, "total_tokens": 30}
    }))
    .into_response()
}

async fn spawn_fake_service() -> SocketAddr {
    let app = Router::new().route("/v1/chat/completions", post(fake_completions));
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

fn app_without_service() -> Router {
    let state = AppState::from_parts(QuizConfig::default(), SchemaTemplate::default(), None);
    build_router(Arc::new(state))
}

async fn app_with_fake_service(model: &str) -> Router {
    let addr = spawn_fake_service().await;
    let oa = OpenAI::new(reqwest::Client::new(), "test-key", format!("http://{}/v1", addr), model, model);
    let state = AppState::from_parts(QuizConfig::default(), SchemaTemplate::default(), Some(oa));
    build_router(Arc::new(state))
}

fn multipart_body(file_name: &str, file: &[u8], number: &str) -> Vec<u8> {
    let mut out = Vec::new();
    let mut text_field = |name: &str, value: &str| {
        out.extend_from_slice(
            format!("--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n").as_bytes(),
        );
    };
    text_field("number", number);
    text_field("subject", "Biology");
    text_field("tone", "Simple");
    out.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
        )
        .as_bytes(),
    );
    out.extend_from_slice(file);
    out.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
    out
}

fn upload(file_name: &str, file: &[u8], number: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/v1/quiz")
        .header("content-type", format!("multipart/form-data; boundary={BOUNDARY}"))
        .body(Body::from(multipart_body(file_name, file, number)))
        .unwrap()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn send(app: Router, req: Request<Body>) -> (StatusCode, Value) {
    let res = app.oneshot(req).await.unwrap();
    let status = res.status();
    let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

#[tokio::test]
async fn health_reports_generation_availability() {
    let req = Request::builder().uri("/api/v1/health").body(Body::empty()).unwrap();
    let (status, body) = send(app_without_service(), req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"ok": true, "generation_enabled": false}));
}

#[tokio::test]
async fn docx_upload_is_unsupported() {
    let (status, body) = send(app_without_service(), upload("essay.docx", b"PK\x03\x04", "5")).await;
    assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
    assert_eq!(body["kind"], "unsupported_format");
    assert!(body["message"].as_str().unwrap().contains(".docx"));
}

#[tokio::test]
async fn invalid_utf8_text_upload_is_a_decoding_error() {
    let (status, body) = send(app_without_service(), upload("notes.txt", &[0xff, 0xfe, 0x00], "5")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "decoding_error");
}

#[tokio::test]
async fn generation_without_service_is_unavailable() {
    let (status, body) = send(app_without_service(), upload("notes.txt", b"Cells have organelles.", "3")).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["kind"], "generation_service_error");
}

#[tokio::test]
async fn out_of_range_question_count_is_rejected() {
    let (status, body) = send(app_without_service(), upload("notes.txt", b"Cells.", "51")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "invalid_request");
}

#[tokio::test]
async fn text_upload_produces_quiz_and_review() {
    let app = app_with_fake_service("quiz-model").await;
    let (status, body) = send(app, upload("notes.txt", b"Mitochondria produce ATP.", "1")).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["subject"], "Biology");
    assert_eq!(body["review"], REVIEW_REPLY);
    assert_eq!(body["raw_quiz"], QUIZ_REPLY);
    let questions = body["questions"].as_array().unwrap();
    assert_eq!(questions.len(), 1);
    assert_eq!(questions[0]["question"], "What do mitochondria make?");
    assert_eq!(questions[0]["option_a"], "ATP");
    assert_eq!(questions[0]["correct"], "a");
    assert_eq!(questions[0]["hint"], "");
}

#[tokio::test]
async fn json_text_endpoint_runs_the_same_pipeline() {
    let app = app_with_fake_service("quiz-model").await;
    let req = post_json("/api/v1/quiz/text", json!({"text": "Mitochondria produce ATP.", "number": 1, "subject": "Biology", "tone": "Hard"}));
    let (status, body) = send(app, req).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["questions"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn rate_limit_is_surfaced() {
    let app = app_with_fake_service("limited").await;
    let (status, body) = send(app, upload("notes.txt", b"Mitochondria produce ATP.", "1")).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert!(body["message"].as_str().unwrap().contains("Rate limit reached"));
}

#[tokio::test]
async fn parse_endpoint_normalizes_raw_quiz() {
    let req = post_json("/api/v1/parse", json!({"raw": QUIZ_REPLY}));
    let (status, body) = send(app_without_service(), req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["questions"][0]["option_d"], "Fat");
}

#[tokio::test]
async fn parse_endpoint_rejects_prose() {
    let req = post_json("/api/v1/parse", json!({"raw": "not json at all"}));
    let (status, body) = send(app_without_service(), req).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["kind"], "parse_error");
}

#[tokio::test]
async fn check_endpoint_grades_a_choice() {
    let question = json!({
        "question": "2+2?", "option_a": "3", "option_b": "4", "option_c": "5", "option_d": "6",
        "correct": "Option B"
    });
    let req = post_json("/api/v1/check", json!({"question": question, "choice": "b"}));
    let (status, body) = send(app_without_service(), req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"correct": true, "expected": "b"}));

    let req = post_json("/api/v1/check", json!({"question": question, "choice": "3"}));
    let (_, body) = send(app_without_service(), req).await;
    assert_eq!(body["correct"], false);
}

#[tokio::test]
async fn malformed_json_body_is_an_invalid_request() {
    let req = post_json("/api/v1/quiz/text", json!({"text": "Cells.", "number": -1, "subject": "Biology", "tone": "Simple"}));
    let (status, body) = send(app_without_service(), req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "invalid_request");
    assert!(body["message"].as_str().unwrap().contains("malformed JSON body"));

    let req = Request::builder()
        .method("POST")
        .uri("/api/v1/parse")
        .header("content-type", "application/json")
        .body(Body::from("{\"raw\": "))
        .unwrap();
    let (status, body) = send(app_without_service(), req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "invalid_request");
}

#[tokio::test]
async fn upload_without_multipart_content_type_is_an_invalid_request() {
    let req = post_json("/api/v1/quiz", json!({"text": "Cells."}));
    let (status, body) = send(app_without_service(), req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "invalid_request");
}

#[tokio::test]
async fn check_endpoint_prefers_exact_option_text() {
    let question = json!({
        "question": "Which one is a bird?", "option_a": "Dog", "option_b": "Cat",
        "option_c": "A sparrow", "option_d": "Trout", "correct": "A sparrow"
    });
    let req = post_json("/api/v1/check", json!({"question": question, "choice": "c"}));
    let (status, body) = send(app_without_service(), req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"correct": true, "expected": "c"}));
}

#[tokio::test]
async fn oversized_upload_is_refused() {
    let mut cfg = QuizConfig::default();
    cfg.generation.max_upload_bytes = 16;
    let app = build_router(Arc::new(AppState::from_parts(cfg, SchemaTemplate::default(), None)));
    let big = vec![b'x'; 256 * 1024];
    let (status, body) = send(app, upload("notes.txt", &big, "1")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "invalid_request");
}
