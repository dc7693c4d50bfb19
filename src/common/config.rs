//! ルーター設定（ボディ取り込み方式、ボディサイズ上限）

use std::env;
use std::str::FromStr;
use log::warn;

/// ボディ取り込み方式を指定する環境変数
pub const BODY_MODE_ENV: &str = "LANEWAY_BODY_MODE";
/// ボディサイズ上限（バイト）を指定する環境変数
pub const MAX_BODY_SIZE_ENV: &str = "LANEWAY_MAX_BODY_SIZE";

/// デフォルトのボディサイズ上限（5MB）
pub const DEFAULT_MAX_BODY_SIZE: usize = 5 * 1024 * 1024;

/// JSONボディの取り込み方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BodyMode {
    /// 最初のデータチャンクをボディ全体として解釈する（後続チャンクは読まない）
    #[default]
    FirstChunk,
    /// ストリーム終端まで全チャンクを連結してから解釈する
    Aggregate,
}

impl FromStr for BodyMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "first-chunk" | "first_chunk" => Ok(BodyMode::FirstChunk),
            "aggregate" => Ok(BodyMode::Aggregate),
            other => Err(format!("unknown body mode '{}'", other)),
        }
    }
}

/// ルーター全体の設定
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouterConfig {
    /// JSONボディの取り込み方式
    pub body_mode: BodyMode,
    /// ボディサイズ上限（バイト）
    pub max_body_size: usize,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            body_mode: BodyMode::default(),
            max_body_size: DEFAULT_MAX_BODY_SIZE,
        }
    }
}

impl RouterConfig {
    /// 環境変数から設定を読み込む
    ///
    /// 優先順位: 環境変数 -> デフォルト値。解析できない値はデフォルトに戻す。
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let body_mode = match env::var(BODY_MODE_ENV) {
            Ok(raw) => raw.parse().unwrap_or_else(|e| {
                warn!("{}: {}, falling back to {:?}", BODY_MODE_ENV, e, defaults.body_mode);
                defaults.body_mode
            }),
            Err(_) => defaults.body_mode,
        };

        let max_body_size = match env::var(MAX_BODY_SIZE_ENV) {
            Ok(raw) => raw.trim().parse::<usize>().unwrap_or_else(|e| {
                warn!(
                    "{}: invalid value '{}' ({}), falling back to {}",
                    MAX_BODY_SIZE_ENV, raw, e, defaults.max_body_size
                );
                defaults.max_body_size
            }),
            Err(_) => defaults.max_body_size,
        };

        Self { body_mode, max_body_size }
    }

    /// ボディ取り込み方式を設定
    pub fn with_body_mode(mut self, body_mode: BodyMode) -> Self {
        self.body_mode = body_mode;
        self
    }

    /// ボディサイズ上限を設定
    pub fn with_max_body_size(mut self, max_body_size: usize) -> Self {
        self.max_body_size = max_body_size;
        self
    }
}
