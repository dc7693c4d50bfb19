//! 共通の抽象化レイヤーとトレイト定義

pub mod config;
pub mod context;
pub mod http;
pub mod request;
pub mod response;
pub mod traits;
pub mod utils;

pub use config::{BodyMode, RouterConfig};
pub use context::RequestContext;
pub use http::{BodySender, BodyStream, Method, RawRequest, StatusCode};
pub use request::{BodyFuture, Request};
pub use response::{Response, ResponseParts, ResponseReceiver};
pub use traits::Middleware;
pub use utils::{parse_query_string, path_of, percent_decode, query_of};
