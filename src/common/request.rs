//! リクエストビューの実装（クエリパラメータとJSONボディの遅延・メモ化抽出）

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

use bytes::BytesMut;
use futures::future::{BoxFuture, FutureExt, Shared};
use futures::StreamExt;
use log::{debug, trace};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::Error;
use super::config::{BodyMode, RouterConfig};
use super::context::RequestContext;
use super::http::{BodyStream, RawRequest};
use super::utils::{parse_query_string, path_of, query_of};

/// JSONボディ解析の共有future
///
/// 何度取得しても同じ処理を指し、同じ値（同じ`Arc`）で完了する。
pub type BodyFuture = Shared<BoxFuture<'static, Result<Arc<Value>, Error>>>;

struct RequestInner {
    method: String,
    url: String,
    body_mode: BodyMode,
    max_body_size: usize,
    stream: Mutex<Option<BodyStream>>,
    query_params: OnceLock<HashMap<String, String>>,
    body: OnceLock<BodyFuture>,
    context: Mutex<RequestContext>,
}

/// リクエスト単位のビュー
///
/// ディスパッチャがリクエストごとに生成し、チェーンの全要素で共有される。
/// クローンは同じリクエストを指す。
#[derive(Clone)]
pub struct Request {
    inner: Arc<RequestInner>,
}

impl fmt::Debug for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Request")
            .field("method", &self.inner.method)
            .field("url", &self.inner.url)
            .finish_non_exhaustive()
    }
}

impl Request {
    /// 生のリクエストからビューを作成
    pub fn new(raw: RawRequest, config: &RouterConfig) -> Self {
        Self {
            inner: Arc::new(RequestInner {
                method: raw.method,
                url: raw.url,
                body_mode: config.body_mode,
                max_body_size: config.max_body_size,
                stream: Mutex::new(Some(raw.body)),
                query_params: OnceLock::new(),
                body: OnceLock::new(),
                context: Mutex::new(RequestContext::new()),
            }),
        }
    }

    /// HTTPメソッド文字列
    pub fn method(&self) -> &str {
        &self.inner.method
    }

    /// リクエストURL
    pub fn url(&self) -> &str {
        &self.inner.url
    }

    /// URLのパス部分
    pub fn path(&self) -> &str {
        path_of(&self.inner.url)
    }

    /// URLの生クエリ文字列
    pub fn query_string(&self) -> &str {
        query_of(&self.inner.url)
    }

    /// クエリパラメータを取得
    ///
    /// 初回呼び出し時にデコードしてキャッシュし、以降は同じマップを返す。
    pub fn query_params(&self) -> &HashMap<String, String> {
        self.inner.query_params.get_or_init(|| {
            trace!("Parsing query string for {}", self.inner.url);
            parse_query_string(self.query_string())
        })
    }

    /// クエリパラメータを1件取得
    pub fn query_param(&self, key: &str) -> Option<&str> {
        self.query_params().get(key).map(String::as_str)
    }

    /// ボディをJSONとして取得
    ///
    /// 初回呼び出し時に読み取り処理を1つだけ作成してキャッシュする。
    /// 以降の呼び出しは同じ処理を返し、ストリームを再度読むことはない。
    /// データが届かないままストリームが終わった場合は空オブジェクトになる。
    pub fn body_json(&self) -> BodyFuture {
        self.inner
            .body
            .get_or_init(|| {
                let stream = self
                    .inner
                    .stream
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .take();
                read_json_body(stream, self.inner.body_mode, self.inner.max_body_size)
                    .boxed()
                    .shared()
            })
            .clone()
    }

    /// ボディをJSONとして読み取り、任意の型にデシリアライズ
    pub async fn body_as<T: DeserializeOwned>(&self) -> Result<T, Error> {
        let value = self.body_json().await?;
        T::deserialize(value.as_ref()).map_err(|e| Error::InvalidRequestBody(e.to_string()))
    }

    /// コンテキストに値を設定
    pub fn set_context<T: Send + Sync + 'static>(&self, key: &str, value: T) {
        self.inner
            .context
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .set(key, value);
    }

    /// コンテキストから値を取得
    pub fn context<T: Send + Sync + 'static>(&self, key: &str) -> Option<Arc<T>> {
        self.inner
            .context
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
    }
}

fn empty_object() -> Arc<Value> {
    Arc::new(Value::Object(serde_json::Map::new()))
}

fn parse_json(bytes: &[u8]) -> Result<Arc<Value>, Error> {
    serde_json::from_slice(bytes)
        .map(Arc::new)
        .map_err(|e| Error::InvalidRequestBody(e.to_string()))
}

fn ensure_within_limit(size: usize, limit: usize) -> Result<(), Error> {
    if size > limit {
        return Err(Error::PayloadTooLarge { size, limit });
    }
    Ok(())
}

async fn read_json_body(
    stream: Option<BodyStream>,
    mode: BodyMode,
    limit: usize,
) -> Result<Arc<Value>, Error> {
    let Some(mut stream) = stream else {
        return Ok(empty_object());
    };

    match mode {
        BodyMode::FirstChunk => {
            while let Some(chunk) = stream.next().await {
                let chunk = chunk?;
                if chunk.is_empty() {
                    continue;
                }
                ensure_within_limit(chunk.len(), limit)?;
                debug!("Parsing {} byte body from first chunk", chunk.len());
                return parse_json(&chunk);
            }
            Ok(empty_object())
        }
        BodyMode::Aggregate => {
            let mut buffer = BytesMut::new();
            while let Some(chunk) = stream.next().await {
                let chunk = chunk?;
                ensure_within_limit(buffer.len() + chunk.len(), limit)?;
                buffer.extend_from_slice(&chunk);
            }
            if buffer.is_empty() {
                return Ok(empty_object());
            }
            debug!("Parsing {} byte aggregated body", buffer.len());
            parse_json(&buffer)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use serde::Deserialize;
    use serde_json::json;

    fn request(raw: RawRequest) -> Request {
        Request::new(raw, &RouterConfig::default())
    }

    #[test]
    fn test_path_and_query_accessors() {
        let req = request(RawRequest::new("GET", "/a?b=c%20d"));
        assert_eq!(req.method(), "GET");
        assert_eq!(req.path(), "/a");
        assert_eq!(req.query_string(), "b=c%20d");
    }

    #[test]
    fn test_query_params_are_decoded_and_cached() {
        let req = request(RawRequest::new("GET", "/a?b=c%20d"));

        let first = req.query_params();
        assert_eq!(first.get("b"), Some(&"c d".to_string()));

        let second = req.query_params();
        assert!(std::ptr::eq(first, second));
        assert_eq!(req.query_param("b"), Some("c d"));
    }

    #[test]
    fn test_query_params_shared_between_clones() {
        let req = request(RawRequest::new("GET", "/a?x=1"));
        let clone = req.clone();
        assert!(std::ptr::eq(req.query_params(), clone.query_params()));
    }

    #[tokio::test]
    async fn test_body_json_single_chunk() {
        let req = request(RawRequest::new("POST", "/a").with_body(r#"{"b":"c d"}"#));
        let body = req.body_json().await.unwrap();
        assert_eq!(*body, json!({ "b": "c d" }));
    }

    #[tokio::test]
    async fn test_body_json_memoized() {
        let req = request(RawRequest::new("POST", "/a").with_body(r#"{"b":"c d"}"#));
        let first = req.body_json().await.unwrap();
        let second = req.body_json().await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[tokio::test]
    async fn test_body_json_empty_stream_is_empty_object() {
        let req = request(RawRequest::new("GET", "/a"));
        assert_eq!(*req.body_json().await.unwrap(), json!({}));
    }

    #[tokio::test]
    async fn test_body_json_malformed_rejects_every_awaiter() {
        let req = request(RawRequest::new("POST", "/a").with_body("{not json"));
        let first = req.body_json().await;
        let second = req.body_json().await;
        assert!(matches!(first, Err(Error::InvalidRequestBody(_))));
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_first_chunk_mode_ignores_later_chunks() {
        // 最初のチャンクだけがボディ全体として扱われる
        let req = request(RawRequest::new("POST", "/a").with_chunks(vec![
            Bytes::from_static(br#"{"b":1}"#),
            Bytes::from_static(b"trailing garbage"),
        ]));
        assert_eq!(*req.body_json().await.unwrap(), json!({ "b": 1 }));
    }

    #[tokio::test]
    async fn test_first_chunk_mode_does_not_aggregate_split_body() {
        let req = request(RawRequest::new("POST", "/a").with_chunks(vec![
            Bytes::from_static(br#"{"b":"#),
            Bytes::from_static(br#""c d"}"#),
        ]));
        assert!(matches!(req.body_json().await, Err(Error::InvalidRequestBody(_))));
    }

    #[tokio::test]
    async fn test_aggregate_mode_joins_chunks() {
        let config = RouterConfig::default().with_body_mode(BodyMode::Aggregate);
        let raw = RawRequest::new("POST", "/a").with_chunks(vec![
            Bytes::from_static(br#"{"b":"#),
            Bytes::from_static(br#""c d"}"#),
        ]);
        let req = Request::new(raw, &config);
        assert_eq!(*req.body_json().await.unwrap(), json!({ "b": "c d" }));
    }

    #[tokio::test]
    async fn test_aggregate_mode_empty_stream_is_empty_object() {
        let config = RouterConfig::default().with_body_mode(BodyMode::Aggregate);
        let req = Request::new(RawRequest::new("POST", "/a"), &config);
        assert_eq!(*req.body_json().await.unwrap(), json!({}));
    }

    #[tokio::test]
    async fn test_body_size_limit() {
        let config = RouterConfig::default().with_max_body_size(4);
        let req = Request::new(RawRequest::new("POST", "/a").with_body(r#"{"b":1}"#), &config);
        assert_eq!(
            req.body_json().await,
            Err(Error::PayloadTooLarge { size: 7, limit: 4 })
        );
    }

    #[tokio::test]
    async fn test_body_stream_error_propagates() {
        let (raw, sender) = RawRequest::channel("POST", "/a");
        sender.fail(Error::BodyStream("connection reset".to_string()));
        let req = request(raw);
        assert_eq!(
            req.body_json().await,
            Err(Error::BodyStream("connection reset".to_string()))
        );
    }

    #[tokio::test]
    async fn test_body_resolves_on_first_chunk_before_stream_end() {
        let (raw, sender) = RawRequest::channel("POST", "/a");
        let req = request(raw);
        assert!(sender.send_chunk(r#"{"ready":true}"#));

        // 送信側をまだ閉じていなくても最初のチャンクで完了する
        let body = req.body_json().await.unwrap();
        assert_eq!(*body, json!({ "ready": true }));
        drop(sender);
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct Payload {
        b: String,
    }

    #[tokio::test]
    async fn test_body_as_typed() {
        let req = request(RawRequest::new("POST", "/a").with_body(r#"{"b":"c d"}"#));
        let payload: Payload = req.body_as().await.unwrap();
        assert_eq!(payload, Payload { b: "c d".to_string() });

        let wrong: Result<Vec<u8>, Error> = req.body_as().await;
        assert!(matches!(wrong, Err(Error::InvalidRequestBody(_))));
    }

    #[test]
    fn test_context_is_shared_across_clones() {
        let req = request(RawRequest::new("GET", "/"));
        let clone = req.clone();
        req.set_context("user_id", 42u64);
        assert_eq!(clone.context::<u64>("user_id").as_deref(), Some(&42));
        assert!(clone.context::<String>("user_id").is_none());
    }
}
