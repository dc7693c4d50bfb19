//! グローバルミドルウェアの登録簿

use std::sync::Arc;

use crate::common::Middleware;

/// 登録順（古いものが先）に並ぶミドルウェアの列
#[derive(Clone, Default)]
pub struct MiddlewareRegistry {
    middlewares: Vec<Arc<dyn Middleware>>,
}

impl MiddlewareRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// ミドルウェアを末尾に追加
    pub fn push(&mut self, middleware: Arc<dyn Middleware>) {
        self.middlewares.push(middleware);
    }

    /// 登録順に走査
    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Middleware>> {
        self.middlewares.iter()
    }

    pub fn len(&self) -> usize {
        self.middlewares.len()
    }

    pub fn is_empty(&self) -> bool {
        self.middlewares.is_empty()
    }
}
