//! リクエストコンテキストの実装

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// リクエストコンテキスト（チェーン内の要素間でのデータ共有）
#[derive(Default, Clone)]
pub struct RequestContext {
    metadata: HashMap<String, Arc<dyn Any + Send + Sync>>,
}

impl fmt::Debug for RequestContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestContext")
            .field("keys", &self.metadata.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl RequestContext {
    /// 新しいRequestContextを作成
    pub fn new() -> Self {
        Self::default()
    }

    /// 値を設定（同じキーは上書き）
    pub fn set<T: Send + Sync + 'static>(&mut self, key: &str, value: T) {
        self.metadata.insert(key.to_string(), Arc::new(value));
    }

    /// 値を取得（型が一致しない場合はNone）
    pub fn get<T: Send + Sync + 'static>(&self, key: &str) -> Option<Arc<T>> {
        self.metadata
            .get(key)
            .cloned()
            .and_then(|value| value.downcast::<T>().ok())
    }

    pub fn is_empty(&self) -> bool {
        self.metadata.is_empty()
    }
}
