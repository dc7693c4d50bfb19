use std::future::Future;
use std::marker::PhantomData;

use async_trait::async_trait;

use crate::common::{Middleware, Request, Response};
use crate::dispatch::Next;
use crate::error::Error;

use super::response::ResponseWrapper;

/// クロージャをミドルウェアとして扱うアダプタ
pub struct FnMiddleware<F> {
    handler_fn: F,
}

/// `Fn(Request, Response, Next) -> Future`をミドルウェアに変換
///
/// ```ignore
/// let fallback = from_fn(|_req, res, next| async move {
///     next.run().await?;
///     if !res.is_finished() {
///         res.set_status(404u16);
///         res.end("404")?;
///     }
///     Ok(())
/// });
/// ```
pub fn from_fn<F, Fut>(handler_fn: F) -> FnMiddleware<F>
where
    F: Fn(Request, Response, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), Error>> + Send + 'static,
{
    FnMiddleware { handler_fn }
}

#[async_trait]
impl<F, Fut> Middleware for FnMiddleware<F>
where
    F: Fn(Request, Response, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), Error>> + Send + 'static,
{
    async fn handle(&self, req: Request, res: Response, next: Next) -> Result<(), Error> {
        (self.handler_fn)(req, res, next).await
    }
}

/// 戻り値をそのままレスポンスとして送信する終端ハンドラー
///
/// 継続は呼ばない。ルートハンドラーとしての利用を想定している。
pub struct JsonHandler<F, R> {
    handler_fn: F,
    _response_type: PhantomData<fn() -> R>,
}

/// `Fn(Request) -> Future<Output = Result<R, Error>>`から終端ハンドラーを作成
pub fn json<F, Fut, R>(handler_fn: F) -> JsonHandler<F, R>
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<R, Error>> + Send + 'static,
    R: ResponseWrapper + Send + 'static,
{
    JsonHandler {
        handler_fn,
        _response_type: PhantomData,
    }
}

#[async_trait]
impl<F, Fut, R> Middleware for JsonHandler<F, R>
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<R, Error>> + Send + 'static,
    R: ResponseWrapper + Send + 'static,
{
    async fn handle(&self, req: Request, res: Response, _next: Next) -> Result<(), Error> {
        let result = (self.handler_fn)(req).await?;
        result.write_to(&res)
    }
}
