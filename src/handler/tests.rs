use super::*;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::common::{Middleware, RawRequest, Request, Response, RouterConfig};
use crate::dispatch::{ExecutionChain, MiddlewareRegistry};
use crate::error::Error;

#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct TestRequest {
    name: String,
    value: i32,
}

#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct TestResponse {
    message: String,
    value: i32,
}

async fn double_handler(req: Request) -> Result<TestResponse, Error> {
    let body: TestRequest = req.body_as().await?;
    Ok(TestResponse {
        message: format!("Hello, {}", body.name),
        value: body.value * 2,
    })
}

fn request(body: &str) -> Request {
    Request::new(RawRequest::new("POST", "/users").with_body(body.to_string()), &RouterConfig::default())
}

async fn run_single(handler: Arc<dyn Middleware>, req: Request, res: Response) -> Result<(), Error> {
    ExecutionChain::build(&MiddlewareRegistry::new(), Some(&handler))
        .run(req, res)
        .await
}

#[tokio::test]
async fn test_from_fn_ends_response() {
    let handler: Arc<dyn Middleware> = Arc::new(from_fn(|_req, res: Response, _next| async move {
        res.send_text("Hello")
    }));
    let (res, rx) = Response::channel();
    run_single(handler, request("{}"), res).await.unwrap();

    let parts = rx.await.unwrap();
    assert_eq!(parts.status, 200);
    assert_eq!(parts.text().unwrap(), "Hello");
}

#[tokio::test]
async fn test_json_handler_execution() {
    let handler: Arc<dyn Middleware> = Arc::new(json(double_handler));
    let (res, rx) = Response::channel();
    run_single(handler, request(r#"{"name":"Test User","value":21}"#), res)
        .await
        .unwrap();

    let parts = rx.await.unwrap();
    assert_eq!(parts.headers.get("Content-Type"), Some(&"application/json".to_string()));
    let response: TestResponse = serde_json::from_slice(&parts.body).unwrap();
    assert_eq!(response.message, "Hello, Test User");
    assert_eq!(response.value, 42);
}

#[tokio::test]
async fn test_json_handler_invalid_body() {
    let handler: Arc<dyn Middleware> = Arc::new(json(double_handler));
    let (res, _rx) = Response::channel();
    let result = run_single(handler, request(r#"{"name":"missing value"}"#), res.clone()).await;

    assert!(matches!(result, Err(Error::InvalidRequestBody(_))));
    // エラー時はレスポンスを送信しない
    assert!(!res.is_finished());
}

#[tokio::test]
async fn test_json_handler_does_not_continue() {
    let reached = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let mut registry = MiddlewareRegistry::new();
    registry.push(Arc::new(json(|_req| async { Ok(serde_json::json!({ "ok": true })) })));
    let after: Arc<dyn Middleware> = {
        let reached = reached.clone();
        Arc::new(from_fn(move |_req, _res, _next| {
            reached.store(true, std::sync::atomic::Ordering::SeqCst);
            async { Ok(()) }
        }))
    };

    let (res, rx) = Response::channel();
    ExecutionChain::build(&registry, Some(&after))
        .run(request("{}"), res)
        .await
        .unwrap();

    assert!(!reached.load(std::sync::atomic::Ordering::SeqCst));
    assert_eq!(rx.await.unwrap().text().unwrap(), r#"{"ok":true}"#);
}
