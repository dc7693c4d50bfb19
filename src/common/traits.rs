//! コアトレイト定義（Middleware）

use async_trait::async_trait;
use crate::dispatch::Next;
use crate::error::Error;
use super::request::Request;
use super::response::Response;

/// ミドルウェア（インターセプター）の特性
///
/// グローバルミドルウェアとルートハンドラーの両方がこの特性を実装する。
/// `next`を呼ばなければチェーンはそこで止まり、`next.run().await`の後に書いた処理は
/// 後続のチェーン全体が完了してから実行される。
#[async_trait]
pub trait Middleware: Send + Sync {
    /// リクエストを処理
    async fn handle(&self, req: Request, res: Response, next: Next) -> Result<(), Error>;
}
