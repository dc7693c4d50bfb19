//! ルートテーブル（メソッドと完全一致パスからハンドラーへの対応）

use std::collections::HashMap;
use std::sync::Arc;

use log::{debug, trace};

use crate::common::{Method, Middleware};

/// (メソッド, パス)ごとに1つのハンドラーを保持するテーブル
///
/// パスは文字列の完全一致でのみ照合する。
#[derive(Clone, Default)]
pub struct RouteTable {
    routes: HashMap<Method, HashMap<String, Arc<dyn Middleware>>>,
}

impl RouteTable {
    /// 空のテーブルを作成
    pub fn new() -> Self {
        Self::default()
    }

    /// ハンドラーを登録
    ///
    /// 同じ(メソッド, パス)が既にあれば置き換え、置き換えたかどうかを返す。
    pub fn insert(&mut self, method: Method, path: impl Into<String>, handler: Arc<dyn Middleware>) -> bool {
        let path = path.into();
        let replaced = self
            .routes
            .entry(method)
            .or_default()
            .insert(path.clone(), handler)
            .is_some();
        if replaced {
            debug!("Replaced handler for {} {}", method, path);
        }
        replaced
    }

    /// 完全一致するハンドラーを検索
    pub fn lookup(&self, method: Method, path: &str) -> Option<&Arc<dyn Middleware>> {
        let found = self.routes.get(&method).and_then(|paths| paths.get(path));
        trace!("Route lookup {} {}: {}", method, path, found.is_some());
        found
    }

    /// 登録済みルート数
    pub fn len(&self) -> usize {
        self.routes.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
