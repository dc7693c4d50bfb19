//! レスポンスビューの実装

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use bytes::Bytes;
use log::warn;
use serde::Serialize;
use tokio::sync::oneshot;

use crate::error::Error;
use super::http::StatusCode;
use super::utils::validate_header;

/// 送信済みレスポンスの内容（トランスポート層が受け取る）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseParts {
    /// HTTPステータスコード
    pub status: u16,
    /// HTTPヘッダー
    pub headers: HashMap<String, String>,
    /// レスポンスボディ
    pub body: Bytes,
}

impl ResponseParts {
    /// ボディをUTF-8文字列として取得
    pub fn text(&self) -> Result<&str, Error> {
        std::str::from_utf8(&self.body).map_err(|e| Error::InternalServerError(e.to_string()))
    }
}

/// トランスポート層が送信済みレスポンスを待つための受信側
pub type ResponseReceiver = oneshot::Receiver<ResponseParts>;

#[derive(Debug)]
struct ResponseState {
    status: u16,
    headers: HashMap<String, String>,
    sender: Option<oneshot::Sender<ResponseParts>>,
}

/// リクエスト単位のレスポンスビュー
///
/// ステータスとヘッダーは`end`まで自由に変更でき、`end`は1リクエストにつき1回だけ有効。
/// クローンは同じレスポンスを指す。
#[derive(Clone)]
pub struct Response {
    state: Arc<Mutex<ResponseState>>,
}

impl fmt::Debug for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.lock();
        f.debug_struct("Response")
            .field("status", &state.status)
            .field("finished", &state.sender.is_none())
            .finish()
    }
}

impl Response {
    /// レスポンスと、送信済みレスポンスを受け取る受信側を作成
    pub fn channel() -> (Self, ResponseReceiver) {
        let (tx, rx) = oneshot::channel();
        let response = Self {
            state: Arc::new(Mutex::new(ResponseState {
                status: StatusCode::Ok.as_u16(),
                headers: HashMap::new(),
                sender: Some(tx),
            })),
        };
        (response, rx)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ResponseState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// 現在のステータスコード
    pub fn status(&self) -> u16 {
        self.lock().status
    }

    /// ステータスコードを設定
    pub fn set_status(&self, status: impl Into<u16>) {
        self.lock().status = status.into();
    }

    /// ヘッダーを設定（同名は上書き）
    pub fn set_header(&self, key: impl Into<String>, value: impl Into<String>) -> Result<(), Error> {
        let key = key.into();
        let value = value.into();
        validate_header(&key, &value)?;
        self.lock().headers.insert(key, value);
        Ok(())
    }

    /// ヘッダーを取得
    pub fn header(&self, key: &str) -> Option<String> {
        self.lock().headers.get(key).cloned()
    }

    /// 既に送信済みかどうか
    pub fn is_finished(&self) -> bool {
        self.lock().sender.is_none()
    }

    /// ペイロードを書き込んでレスポンスを閉じる
    pub fn end(&self, body: impl Into<Bytes>) -> Result<(), Error> {
        let (sender, parts) = {
            let mut state = self.lock();
            let sender = state.sender.take().ok_or_else(|| {
                warn!("Response already sent, ignoring second end()");
                Error::ResponseAlreadySent
            })?;
            let parts = ResponseParts {
                status: state.status,
                headers: state.headers.clone(),
                body: body.into(),
            };
            (sender, parts)
        };

        if sender.send(parts).is_err() {
            warn!("Transport dropped before the response was delivered");
        }
        Ok(())
    }

    /// テキストを送信
    pub fn send_text(&self, text: impl Into<String>) -> Result<(), Error> {
        self.set_header("Content-Type", "text/plain; charset=utf-8")?;
        self.end(text.into())
    }

    /// JSONを送信
    pub fn send_json<T: Serialize>(&self, value: &T) -> Result<(), Error> {
        let json = serde_json::to_vec(value)
            .map_err(|e| Error::ResponseSerializationError(e.to_string()))?;
        self.set_header("Content-Type", "application/json")?;
        self.end(json)
    }
}
