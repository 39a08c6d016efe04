use std::collections::HashMap;

/// 渠道API返回的HTTP响应快照，传输层失败以Err表示而不会构造此类型
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: u16,
    pub body: String,
    headers: HashMap<String, String>,
}

impl ApiResponse {
    pub fn new(status: u16) -> Self {
        Self {
            status,
            body: String::new(),
            headers: HashMap::new(),
        }
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into().to_ascii_lowercase(), value.into());
        self
    }

    /// 按名称查找响应头，不区分大小写
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_server_error(&self) -> bool {
        (500..600).contains(&self.status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_ranges() {
        assert!(ApiResponse::new(200).is_success());
        assert!(ApiResponse::new(201).is_success());
        assert!(!ApiResponse::new(409).is_success());
        assert!(ApiResponse::new(500).is_server_error());
        assert!(ApiResponse::new(503).is_server_error());
        assert!(!ApiResponse::new(400).is_server_error());
    }

    #[test]
    fn test_header_lookup_case_insensitive() {
        let response = ApiResponse::new(201).with_header("Location", "https://example.com/c/abc");
        assert_eq!(response.header("location"), Some("https://example.com/c/abc"));
        assert_eq!(response.header("LOCATION"), Some("https://example.com/c/abc"));
        assert!(response.header("etag").is_none());
    }
}
