//! 共通ユーティリティ関数群（URL分解、URLデコード、クエリ解析、ヘッダー検証）

use std::collections::HashMap;
use crate::error::Error;

/// クエリ文字列の区切り文字
const QUERY_SEPARATOR: char = '?';

/// URLからパス部分（クエリ区切りより前）を取得
pub fn path_of(url: &str) -> &str {
    match url.split_once(QUERY_SEPARATOR) {
        Some((path, _)) => path,
        None => url,
    }
}

/// URLから生のクエリ文字列（クエリ区切りより後）を取得
pub fn query_of(url: &str) -> &str {
    match url.split_once(QUERY_SEPARATOR) {
        Some((_, query)) => query,
        None => "",
    }
}

/// URLエンコーディングのデコード関数
///
/// 不正な`%`シーケンスはそのまま残し、`+`は空白として扱う。
pub fn percent_decode(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut result = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'%' if i + 2 < bytes.len() => {
                if let (Some(h), Some(l)) = (from_hex(bytes[i + 1]), from_hex(bytes[i + 2])) {
                    result.push(h * 16 + l);
                    i += 3;
                    continue;
                }
                result.push(b'%');
            }
            b'+' => result.push(b' '),
            other => result.push(other),
        }
        i += 1;
    }
    String::from_utf8_lossy(&result).into_owned()
}

/// 16進数文字をバイト値に変換するヘルパー関数
fn from_hex(byte: u8) -> Option<u8> {
    match byte {
        b'0'..=b'9' => Some(byte - b'0'),
        b'a'..=b'f' => Some(byte - b'a' + 10),
        b'A'..=b'F' => Some(byte - b'A' + 10),
        _ => None,
    }
}

/// クエリ文字列をパースしてURLデコードを行う
///
/// 同じキーが複数回現れた場合は最後の値が有効になる。
pub fn parse_query_string(query_string: &str) -> HashMap<String, String> {
    let mut params = HashMap::new();

    for pair in query_string.split('&').filter(|pair| !pair.is_empty()) {
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        params.insert(percent_decode(key), percent_decode(value));
    }

    params
}

/// ヘッダー値に使用可能な文字かを判定（CRLF・制御文字を拒否）
pub fn is_header_value_valid(value: &str) -> bool {
    value.chars().all(|c| {
        let code = c as u32;
        code >= 0x20 && code != 0x7F
    })
}

/// ヘッダー名が安全なトークンかを判定
pub fn is_header_name_valid(name: &str) -> bool {
    if name.is_empty() {
        return false;
    }
    // token = 1*tchar
    name.chars().all(|c| {
        c.is_ascii_alphanumeric()
            || matches!(c, '!' | '#' | '$' | '%' | '&' | '\'' | '*' | '+' | '-' | '.' | '^' | '_' | '`' | '|' | '~')
    })
}

/// ヘルパー: 無効なヘッダー名/値ならErrorを返す
pub fn validate_header(name: &str, value: &str) -> Result<(), Error> {
    if !is_header_name_valid(name) {
        return Err(Error::InvalidHeader(format!("header name '{}' is not a valid token", name)));
    }
    if !is_header_value_valid(value) {
        return Err(Error::InvalidHeader(format!(
            "value of '{}' contains control/CRLF characters",
            name
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_and_query_split() {
        assert_eq!(path_of("/a?b=c%20d"), "/a");
        assert_eq!(query_of("/a?b=c%20d"), "b=c%20d");
        assert_eq!(path_of("/plain"), "/plain");
        assert_eq!(query_of("/plain"), "");
        // 2つ目以降の`?`はクエリ側に含まれる
        assert_eq!(path_of("/a?x=1?2"), "/a");
        assert_eq!(query_of("/a?x=1?2"), "x=1?2");
    }

    #[test]
    fn test_parse_query_string() {
        let params = parse_query_string("name=John&age=30&city=Tokyo");

        assert_eq!(params.get("name"), Some(&"John".to_string()));
        assert_eq!(params.get("age"), Some(&"30".to_string()));
        assert_eq!(params.get("city"), Some(&"Tokyo".to_string()));
    }

    #[test]
    fn test_parse_query_string_url_encoding() {
        let query = "name=%E3%81%82%E3%81%84%E3%81%86&city=Tokyo%20Station&lang=ja%2Den";
        let params = parse_query_string(query);

        assert_eq!(params.get("name"), Some(&"あいう".to_string()));
        assert_eq!(params.get("city"), Some(&"Tokyo Station".to_string()));
        assert_eq!(params.get("lang"), Some(&"ja-en".to_string()));
    }

    #[test]
    fn test_parse_query_string_edge_cases() {
        assert!(parse_query_string("").is_empty());

        let params = parse_query_string("flag&&k=1&k=2");
        // 値なしキーは空文字列
        assert_eq!(params.get("flag"), Some(&String::new()));
        // 重複キーは最後の値
        assert_eq!(params.get("k"), Some(&"2".to_string()));
        assert_eq!(params.len(), 2);
    }

    #[test]
    fn test_percent_decode() {
        assert_eq!(percent_decode("Hello%20World"), "Hello World");
        assert_eq!(percent_decode("test%2Bvalue"), "test+value");
        assert_eq!(percent_decode("plus+space"), "plus space");
        assert_eq!(percent_decode("100%"), "100%");
        assert_eq!(percent_decode("%zz%4"), "%zz%4");
        assert_eq!(percent_decode("%41"), "A");
    }

    #[test]
    fn test_header_validation() {
        assert!(validate_header("X-Test", "normal-Value_123").is_ok());
        assert!(validate_header("X-Test", "bad\r\nvalue").is_err());
        assert!(validate_header("X-Test", "bad\x07bell").is_err());
        assert!(validate_header("bad name", "value").is_err());
        assert!(validate_header("", "value").is_err());
    }
}
