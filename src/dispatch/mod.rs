//! ディスパッチ層（ルートテーブル、ミドルウェア登録簿、実行チェーン）

pub mod chain;
pub mod registry;
pub mod table;

pub use chain::{ExecutionChain, Next};
pub use registry::MiddlewareRegistry;
pub use table::RouteTable;
