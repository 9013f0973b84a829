use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, REFERER, USER_AGENT};

use crate::errors::{Result, SyncError};

pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; rv:91.0) Gecko/20100101 Firefox/91.0";

/// 模拟浏览器的请求头，进程内不变
#[derive(Debug, Clone)]
pub struct BrowserHeaderProfile {
    pub user_agent: String,
    pub accept: String,
    pub accept_language: String,
    pub accept_encoding: String,
    pub referer: String,
}

impl BrowserHeaderProfile {
    pub fn new(referer: &str) -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            accept: "*/*".to_string(),
            accept_language: "en-US,en;q=0.5".to_string(),
            accept_encoding: "gzip, deflate, br".to_string(),
            referer: referer.to_string(),
        }
    }

    /// 转为 reqwest 默认请求头。
    ///
    /// Accept-Encoding 不写入：手动设置会关闭 reqwest 的自动解压，
    /// 开启 gzip/deflate/brotli 特性后 reqwest 会发送同样的值。
    pub fn to_header_map(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, header_value(&self.user_agent)?);
        headers.insert(ACCEPT, header_value(&self.accept)?);
        headers.insert(ACCEPT_LANGUAGE, header_value(&self.accept_language)?);
        headers.insert(REFERER, header_value(&self.referer)?);
        Ok(headers)
    }
}

fn header_value(value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value)
        .map_err(|e| SyncError::ConfigError(format!("Invalid header value {:?}: {}", value, e)))
}
