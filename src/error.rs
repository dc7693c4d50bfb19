//! エラー型の定義

use thiserror::Error;

/// アプリケーションのエラー型
///
/// ボディ解析の共有futureから同じ失敗を複数の待機者へ返すため`Clone`を実装する。
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// 未知のHTTPメソッド（登録時に拒否される）
    #[error("Unknown HTTP method: {0}")]
    UnknownMethod(String),

    /// 無効なリクエストボディ
    #[error("Invalid request body: {0}")]
    InvalidRequestBody(String),

    /// リクエストボディが上限を超えた
    #[error("Request body too large: {size} bytes (limit {limit})")]
    PayloadTooLarge { size: usize, limit: usize },

    /// ボディストリームの読み取りエラー
    #[error("Body stream error: {0}")]
    BodyStream(String),

    /// レスポンスが既に送信済み
    #[error("Response has already been sent")]
    ResponseAlreadySent,

    /// 無効なヘッダー
    #[error("Invalid header: {0}")]
    InvalidHeader(String),

    /// レスポンスのシリアライズエラー
    #[error("Failed to serialize response: {0}")]
    ResponseSerializationError(String),

    /// ミドルウェアエラー
    #[error("Middleware error: {0}")]
    MiddlewareError(String),

    /// 内部サーバーエラー
    #[error("Internal server error: {0}")]
    InternalServerError(String),
}

impl Error {
    /// エラーからHTTPステータスコードを取得
    pub fn status_code(&self) -> u16 {
        match self {
            Error::UnknownMethod(_) => 405,
            Error::InvalidRequestBody(_) => 400,
            Error::PayloadTooLarge { .. } => 413,
            Error::BodyStream(_) => 400,
            Error::ResponseAlreadySent => 500,
            Error::InvalidHeader(_) => 500,
            Error::ResponseSerializationError(_) => 500,
            Error::MiddlewareError(_) => 500,
            Error::InternalServerError(_) => 500,
        }
    }
}
