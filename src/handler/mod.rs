//! ハンドラーの実装（クロージャからミドルウェアへの変換）

pub mod adapter;
pub mod response;

pub use adapter::{from_fn, json, FnMiddleware, JsonHandler};
pub use response::ResponseWrapper;

#[cfg(test)]
mod tests;
