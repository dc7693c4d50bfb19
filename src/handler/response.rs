use serde::Serialize;

use crate::common::Response;
use crate::error::Error;

/// レスポンス書き込みトレイト
pub trait ResponseWrapper {
    /// 自身をレスポンスとして送信
    fn write_to(self, res: &Response) -> Result<(), Error>;
}

/// 通常のシリアライズ可能なデータ型はJSONとして送信
impl<T: Serialize> ResponseWrapper for T {
    fn write_to(self, res: &Response) -> Result<(), Error> {
        res.send_json(&self)
    }
}
