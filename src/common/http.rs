//! HTTP関連の基本型（メソッド、ステータスコード、トランスポート入力）

use std::fmt;
use std::str::FromStr;

use bytes::Bytes;
use futures::channel::mpsc;
use futures::stream::{self, BoxStream, StreamExt};

use crate::error::Error;

/// HTTPステータスコード
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCode {
    Ok = 200,
    Created = 201,
    NoContent = 204,
    BadRequest = 400,
    NotFound = 404,
    PayloadTooLarge = 413,
    InternalServerError = 500,
}

impl StatusCode {
    /// u16の値を取得
    pub fn as_u16(&self) -> u16 {
        *self as u16
    }
}

impl From<StatusCode> for u16 {
    fn from(status: StatusCode) -> u16 {
        status.as_u16()
    }
}

/// HTTPメソッド（標準動詞の固定集合）
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub enum Method {
    GET,
    HEAD,
    POST,
    PUT,
    DELETE,
    CONNECT,
    OPTIONS,
    TRACE,
    PATCH,
}

impl Method {
    /// 全メソッドの一覧
    pub const ALL: [Method; 9] = [
        Method::GET,
        Method::HEAD,
        Method::POST,
        Method::PUT,
        Method::DELETE,
        Method::CONNECT,
        Method::OPTIONS,
        Method::TRACE,
        Method::PATCH,
    ];

    /// メソッド名を取得
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::GET => "GET",
            Method::HEAD => "HEAD",
            Method::POST => "POST",
            Method::PUT => "PUT",
            Method::DELETE => "DELETE",
            Method::CONNECT => "CONNECT",
            Method::OPTIONS => "OPTIONS",
            Method::TRACE => "TRACE",
            Method::PATCH => "PATCH",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = Error;

    /// 文字列からMethodに変換（メソッドトークンは大文字小文字を区別する）
    fn from_str(method: &str) -> Result<Self, Self::Err> {
        Method::ALL
            .into_iter()
            .find(|m| m.as_str() == method)
            .ok_or_else(|| Error::UnknownMethod(method.to_string()))
    }
}

/// リクエストボディのバイトストリーム
///
/// 各要素が「データチャンク到着」、ストリーム終端が「ストリーム終了」に相当する。
pub type BodyStream = BoxStream<'static, Result<Bytes, Error>>;

/// トランスポート層から渡される生のリクエスト
pub struct RawRequest {
    /// HTTPメソッド（未検証の文字列）
    pub method: String,
    /// リクエストURL（パス + 任意の`?query`）
    pub url: String,
    /// ボディストリーム
    pub body: BodyStream,
}

impl fmt::Debug for RawRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawRequest")
            .field("method", &self.method)
            .field("url", &self.url)
            .finish_non_exhaustive()
    }
}

impl RawRequest {
    /// ボディなしのリクエストを作成
    pub fn new(method: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            url: url.into(),
            body: stream::empty().boxed(),
        }
    }

    /// ボディを単一チャンクとして設定
    pub fn with_body(self, body: impl Into<Bytes>) -> Self {
        self.with_chunks(vec![body.into()])
    }

    /// ボディを複数チャンクとして設定
    pub fn with_chunks(mut self, chunks: Vec<Bytes>) -> Self {
        self.body = stream::iter(chunks.into_iter().map(Ok)).boxed();
        self
    }

    /// 任意のストリームをボディとして設定
    pub fn with_stream(mut self, body: BodyStream) -> Self {
        self.body = body;
        self
    }

    /// チャンクを逐次送り込むためのチャネル付きリクエストを作成
    pub fn channel(method: impl Into<String>, url: impl Into<String>) -> (Self, BodySender) {
        let (tx, rx) = mpsc::unbounded();
        let request = Self::new(method, url).with_stream(rx.boxed());
        (request, BodySender { tx })
    }
}

/// ボディチャンクの送信側
///
/// 全ての送信側がdropされるとストリームが終了する。
#[derive(Debug, Clone)]
pub struct BodySender {
    tx: mpsc::UnboundedSender<Result<Bytes, Error>>,
}

impl BodySender {
    /// データチャンクを送信（受信側が既に閉じていればfalse）
    pub fn send_chunk(&self, chunk: impl Into<Bytes>) -> bool {
        self.tx.unbounded_send(Ok(chunk.into())).is_ok()
    }

    /// ストリームエラーを送信してストリームを閉じる
    pub fn fail(self, error: Error) {
        let _ = self.tx.unbounded_send(Err(error));
        self.tx.close_channel();
    }

    /// ストリームを終了
    pub fn finish(self) {
        self.tx.close_channel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_from_str() {
        assert_eq!("GET".parse::<Method>(), Ok(Method::GET));
        assert_eq!(
            "get".parse::<Method>(),
            Err(Error::UnknownMethod("get".to_string()))
        );
        assert!("Put".parse::<Method>().is_err());
        assert_eq!("PATCH".parse::<Method>(), Ok(Method::PATCH));
        assert_eq!("TRACE".parse::<Method>(), Ok(Method::TRACE));
        assert_eq!(
            "BREW".parse::<Method>(),
            Err(Error::UnknownMethod("BREW".to_string()))
        );
    }

    #[test]
    fn test_method_display_roundtrip() {
        for method in Method::ALL {
            assert_eq!(method.to_string().parse::<Method>(), Ok(method));
        }
    }

    #[tokio::test]
    async fn test_raw_request_chunks() {
        let raw = RawRequest::new("POST", "/a").with_chunks(vec![
            Bytes::from_static(b"ab"),
            Bytes::from_static(b"cd"),
        ]);
        let chunks: Vec<_> = raw.body.collect().await;
        assert_eq!(chunks, vec![Ok(Bytes::from_static(b"ab")), Ok(Bytes::from_static(b"cd"))]);
    }

    #[tokio::test]
    async fn test_body_sender_finish_ends_stream() {
        let (raw, sender) = RawRequest::channel("POST", "/a");
        assert!(sender.send_chunk("x"));
        sender.finish();

        let chunks: Vec<_> = raw.body.collect().await;
        assert_eq!(chunks, vec![Ok(Bytes::from_static(b"x"))]);
    }
}
