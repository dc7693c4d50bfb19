//! Laneway: 継続渡し型ミドルウェアを備えた最小限のHTTPディスパッチコア
//!
//! リクエストのメソッドとパスから高々1つのルートハンドラーを選び、
//! 登録順のミドルウェアチェーンの後に実行する。

pub mod common;
pub mod dispatch;
pub mod error;
pub mod handler;

#[cfg(feature = "server")]
pub mod server;

use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt};
use log::{debug, info, trace};

pub use common::*;
pub use dispatch::{ExecutionChain, MiddlewareRegistry, Next, RouteTable};
pub use error::*;
pub use handler::{from_fn, json};

/// ルーターを構築するためのビルダー
#[derive(Default)]
pub struct RouterBuilder {
    routes: RouteTable,
    middlewares: MiddlewareRegistry,
    config: RouterConfig,
}

impl RouterBuilder {
    /// 新しいRouterBuilderインスタンスを作成
    pub fn new() -> Self {
        Self::default()
    }

    /// 設定を差し替え
    pub fn config(mut self, config: RouterConfig) -> Self {
        self.config = config;
        self
    }

    /// ルートハンドラーを登録（同じメソッドとパスは上書き）
    pub fn route<H>(mut self, method: Method, path: impl Into<String>, handler: H) -> Self
    where
        H: Middleware + 'static,
    {
        let path = path.into();

        // 開発時はinfo、本番相当ではdebugに落とす
        #[cfg(debug_assertions)]
        info!("Registering handler for {} {}", method, path);
        #[cfg(not(debug_assertions))]
        debug!("Registering handler for {} {}", method, path);

        self.routes.insert(method, path, Arc::new(handler));
        self
    }

    /// メソッド名の文字列でルートハンドラーを登録
    ///
    /// 未知のメソッドは登録せずにエラーを返す。
    pub fn try_route<H>(self, method: &str, path: impl Into<String>, handler: H) -> Result<Self, Error>
    where
        H: Middleware + 'static,
    {
        let method = method.parse::<Method>()?;
        Ok(self.route(method, path, handler))
    }

    /// GETハンドラーを登録
    pub fn get<H: Middleware + 'static>(self, path: impl Into<String>, handler: H) -> Self {
        self.route(Method::GET, path, handler)
    }

    /// HEADハンドラーを登録
    pub fn head<H: Middleware + 'static>(self, path: impl Into<String>, handler: H) -> Self {
        self.route(Method::HEAD, path, handler)
    }

    /// POSTハンドラーを登録
    pub fn post<H: Middleware + 'static>(self, path: impl Into<String>, handler: H) -> Self {
        self.route(Method::POST, path, handler)
    }

    /// PUTハンドラーを登録
    pub fn put<H: Middleware + 'static>(self, path: impl Into<String>, handler: H) -> Self {
        self.route(Method::PUT, path, handler)
    }

    /// DELETEハンドラーを登録
    pub fn delete<H: Middleware + 'static>(self, path: impl Into<String>, handler: H) -> Self {
        self.route(Method::DELETE, path, handler)
    }

    /// CONNECTハンドラーを登録
    pub fn connect<H: Middleware + 'static>(self, path: impl Into<String>, handler: H) -> Self {
        self.route(Method::CONNECT, path, handler)
    }

    /// OPTIONSハンドラーを登録
    pub fn options<H: Middleware + 'static>(self, path: impl Into<String>, handler: H) -> Self {
        self.route(Method::OPTIONS, path, handler)
    }

    /// TRACEハンドラーを登録
    pub fn trace<H: Middleware + 'static>(self, path: impl Into<String>, handler: H) -> Self {
        self.route(Method::TRACE, path, handler)
    }

    /// PATCHハンドラーを登録
    pub fn patch<H: Middleware + 'static>(self, path: impl Into<String>, handler: H) -> Self {
        self.route(Method::PATCH, path, handler)
    }

    /// ミドルウェアを追加（登録順に実行される）
    pub fn middleware<M>(mut self, middleware: M) -> Self
    where
        M: Middleware + 'static,
    {
        self.middlewares.push(Arc::new(middleware));
        debug!("Registered middleware #{}", self.middlewares.len());
        self
    }

    /// ルーターをビルドして返却
    pub fn build(self) -> Router {
        Router {
            routes: self.routes,
            middlewares: self.middlewares,
            config: self.config,
        }
    }
}

/// リクエストをディスパッチするルーター
///
/// 構築後は読み取り専用で、複数のリクエストから共有できる。
pub struct Router {
    routes: RouteTable,
    middlewares: MiddlewareRegistry,
    config: RouterConfig,
}

impl Router {
    /// 新しいRouterBuilderインスタンスを作成
    pub fn builder() -> RouterBuilder {
        RouterBuilder::new()
    }

    /// 完全一致するハンドラを取得
    ///
    /// 未知のメソッド名はマッチなしとして扱う。
    pub fn find_handler(&self, method: &str, path: &str) -> Option<&Arc<dyn Middleware>> {
        match method.parse::<Method>() {
            Ok(method) => self.routes.lookup(method, path),
            Err(_) => {
                debug!("Unknown request method {}, no route can match", method);
                None
            }
        }
    }

    /// ミドルウェアを登録順に取得
    pub fn middlewares(&self) -> impl Iterator<Item = &Arc<dyn Middleware>> {
        self.middlewares.iter()
    }

    /// 設定を取得
    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    /// リクエストを1件ディスパッチ
    ///
    /// ミドルウェア（登録順）とマッチしたハンドラーからチェーンを作り、先頭から実行する。
    /// チェーン内のエラーは変換せずに呼び出し元へ返す。
    /// どの要素もレスポンスを送信しなかった場合もエラーにはしない。
    pub async fn dispatch(&self, raw: RawRequest, res: Response) -> Result<(), Error> {
        let req = Request::new(raw, &self.config);
        let handler = self.find_handler(req.method(), req.path());
        debug!(
            "Dispatching {} {} (handler matched: {})",
            req.method(),
            req.path(),
            handler.is_some()
        );

        let chain = ExecutionChain::build(&self.middlewares, handler);
        trace!("Execution chain built with {} element(s)", chain.len());
        chain.run(req, res).await
    }

    /// トランスポート層のリスナーに直接渡せるディスパッチ関数を取得
    pub fn callback(
        self: Arc<Self>,
    ) -> impl Fn(RawRequest, Response) -> BoxFuture<'static, Result<(), Error>> + Clone + Send + Sync + 'static {
        let router = self;
        move |raw, res| {
            let router = Arc::clone(&router);
            async move { router.dispatch(raw, res).await }.boxed()
        }
    }
}
