//! 実行チェーンと継続（Next）の実装
//!
//! チェーンはリクエストごとに、グローバルミドルウェアのスナップショットと
//! （マッチした場合は）ルートハンドラーを連結して作る。登録簿の格納領域は共有しない。
//!
//! ```text
//! Next(0).run() → mw[0].handle(.., Next(1))
//!                    └ next.run() → mw[1].handle(.., Next(2))
//!                                      └ next.run() → handler.handle(.., Next(3))
//!                                                        └ next.run() → (終端: 何もしない)
//! ```

use std::fmt;
use std::sync::Arc;

use log::trace;

use crate::common::{Middleware, Request, Response};
use crate::error::Error;
use super::registry::MiddlewareRegistry;

/// リクエスト単位の実行チェーン
#[derive(Clone)]
pub struct ExecutionChain {
    links: Arc<[Arc<dyn Middleware>]>,
    has_handler: bool,
}

impl fmt::Debug for ExecutionChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionChain")
            .field("len", &self.links.len())
            .field("has_handler", &self.has_handler)
            .finish()
    }
}

impl ExecutionChain {
    /// ミドルウェア（登録順）の後ろにハンドラーを連結してチェーンを作成
    pub fn build(middlewares: &MiddlewareRegistry, handler: Option<&Arc<dyn Middleware>>) -> Self {
        let links: Vec<Arc<dyn Middleware>> = middlewares
            .iter()
            .chain(handler)
            .cloned()
            .collect();
        Self {
            links: links.into(),
            has_handler: handler.is_some(),
        }
    }

    /// チェーンの長さ
    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    /// 末尾にルートハンドラーがあるかどうか
    pub fn has_handler(&self) -> bool {
        self.has_handler
    }

    /// 先頭からチェーンを実行
    pub async fn run(self, req: Request, res: Response) -> Result<(), Error> {
        Next {
            chain: self,
            index: 0,
            req,
            res,
        }
        .run()
        .await
    }
}

/// 継続：「自分より後ろのチェーンをすべて実行する」呼び出し
///
/// `run`は`self`を消費するため1回しか呼べない。呼ばずにdropすればチェーンはそこで止まる。
/// `'static`かつ`Send`なので`tokio::spawn(next.run())`で待たずに委譲することもできる。
pub struct Next {
    chain: ExecutionChain,
    index: usize,
    req: Request,
    res: Response,
}

impl fmt::Debug for Next {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Next")
            .field("index", &self.index)
            .field("len", &self.chain.len())
            .finish()
    }
}

impl Next {
    /// 次に実行される要素の位置
    pub fn position(&self) -> usize {
        self.index
    }

    /// 未実行の要素数
    pub fn remaining(&self) -> usize {
        self.chain.len().saturating_sub(self.index)
    }

    /// 次の要素が（あれば）ルートハンドラーかどうか
    pub fn is_handler_next(&self) -> bool {
        self.chain.has_handler() && self.index + 1 == self.chain.len()
    }

    /// 残りのチェーンを実行し、その完了を待つ
    ///
    /// 次の要素がなければ何もしない。途中の要素が返したエラーはそのまま伝播する。
    pub async fn run(self) -> Result<(), Error> {
        let Some(current) = self.chain.links.get(self.index).cloned() else {
            trace!("Execution chain exhausted after {} element(s)", self.chain.len());
            return Ok(());
        };

        trace!("Running chain element {}/{}", self.index + 1, self.chain.len());
        let next = Next {
            chain: self.chain.clone(),
            index: self.index + 1,
            req: self.req.clone(),
            res: self.res.clone(),
        };
        current.handle(self.req, self.res, next).await
    }
}
