//! 带 Cookie 的 HTTP 会话
//!
//! 目标站点有反爬机制，先访问落地页拿到 Cookie 才能请求数据接口。
//! Cookie 持久化在本地文件中，过期后整体刷新。任何传输错误或非 2xx
//! 状态都直接返回错误，不做重试。

pub mod cookie_cache;

use log::{debug, info};
use reqwest::blocking::{Client, Response};
use reqwest::header::COOKIE;
use reqwest::Url;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fs::{self, File};
use std::io::{self, ErrorKind, Read, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use crate::config::Config;
use crate::errors::{Result, SyncError};
use crate::models::cookie::CookieJar;
use crate::models::headers::BrowserHeaderProfile;
use cookie_cache::CookieCache;

/// 下载时每次读取的块大小
pub const CHUNK_SIZE: usize = 1_000_000;

/// `request` 的返回值
pub enum Payload {
    Json(Value),
    Raw(Response),
}

pub struct SessionClient {
    client: Client,
    headers: BrowserHeaderProfile,
    cookies: Option<CookieJar>,
    download_dir: PathBuf,
    request_timeout: Duration,
}

impl SessionClient {
    /// 创建会话并准备好有效的 Cookie
    pub fn new(config: &Config) -> Result<Self> {
        let mut session = Self::without_cookies(config)?;
        let cache = CookieCache::new(config.cookie_path());

        let jar = match cache.load() {
            Some(jar) if !jar.has_expired_at(SystemTime::now()) => {
                info!("Using {} cookies from {}", jar.len(), cache.path().display());
                jar
            }
            Some(_) => {
                info!("Cookies in {} have expired, refreshing", cache.path().display());
                session.refresh_cookies(&cache, &config.warmup_url(), config.warmup_timeout)?
            }
            None => session.refresh_cookies(&cache, &config.warmup_url(), config.warmup_timeout)?,
        };

        session.cookies = Some(jar);
        Ok(session)
    }

    /// 不带 Cookie 的会话，用于不需要反爬 Cookie 的站点
    pub fn without_cookies(config: &Config) -> Result<Self> {
        let headers = BrowserHeaderProfile::new(&config.referer);
        let client = Client::builder()
            .default_headers(headers.to_header_map()?)
            .timeout(config.request_timeout)
            .build()
            .map_err(SyncError::RequestError)?;

        Ok(Self {
            client,
            headers,
            cookies: None,
            download_dir: config.download_dir().to_path_buf(),
            request_timeout: config.request_timeout,
        })
    }

    pub fn headers(&self) -> &BrowserHeaderProfile {
        &self.headers
    }

    pub fn cookies(&self) -> Option<&CookieJar> {
        self.cookies.as_ref()
    }

    pub fn download_dir(&self) -> &Path {
        &self.download_dir
    }

    /// 访问落地页获取新 Cookie，并覆盖写入缓存文件
    fn refresh_cookies(&self, cache: &CookieCache, warmup_url: &str, timeout: Duration) -> Result<CookieJar> {
        info!("Requesting fresh cookies from {}", warmup_url);
        let response = self.send(warmup_url, None, timeout, None)?;

        let status = response.status();
        if !status.is_success() {
            return Err(SyncError::CookieAcquisition {
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or("Unknown").to_string(),
            });
        }

        let jar = cookie_cache::harvest(&response, SystemTime::now());
        cache.store(&jar)?;
        Ok(jar)
    }

    /// GET 请求。`expect_json` 为 true 时解析 JSON，否则返回原始响应供调用方读取。
    pub fn request(
        &self,
        url: &str,
        params: Option<&[(&str, &str)]>,
        expect_json: bool,
        timeout: Option<Duration>,
    ) -> Result<Payload> {
        let timeout = timeout.unwrap_or(self.request_timeout);
        let response = self.send(url, params, timeout, self.cookies.as_ref())?;
        let response = ensure_success(response)?;

        if expect_json {
            Ok(Payload::Json(read_json(response)?))
        } else {
            Ok(Payload::Raw(response))
        }
    }

    pub fn get_json<T: DeserializeOwned>(&self, url: &str, params: Option<&[(&str, &str)]>) -> Result<T> {
        let response = self.send(url, params, self.request_timeout, self.cookies.as_ref())?;
        read_json(ensure_success(response)?)
    }

    pub fn get_raw(&self, url: &str, params: Option<&[(&str, &str)]>) -> Result<Response> {
        let response = self.send(url, params, self.request_timeout, self.cookies.as_ref())?;
        ensure_success(response)
    }

    /// 下载到下载目录，文件名取 URL 最后一段路径
    pub fn download(&self, url: &str) -> Result<PathBuf> {
        let file_name = file_name_from_url(url)?;
        let target = self.download_dir.join(&file_name);

        let mut response = self.get_raw(url, None)?;

        if !self.download_dir.exists() {
            fs::create_dir_all(&self.download_dir)?;
        }

        let mut file = File::create(&target)?;
        let mut buf = vec![0u8; CHUNK_SIZE];
        let mut written: u64 = 0;

        loop {
            let n = response.read(&mut buf).map_err(body_read_error)?;
            if n == 0 {
                break;
            }
            file.write_all(&buf[..n])?;
            written += n as u64;
        }
        file.flush()?;

        info!("Downloaded {} ({} bytes) to {}", url, written, target.display());
        Ok(target)
    }

    /// 显式关闭会话，释放连接池
    pub fn close(self) {}

    fn send(
        &self,
        url: &str,
        params: Option<&[(&str, &str)]>,
        timeout: Duration,
        cookies: Option<&CookieJar>,
    ) -> Result<Response> {
        let parsed = Url::parse(url).map_err(|e| SyncError::InvalidUrl(format!("{}: {}", url, e)))?;

        let cookie_header = cookies.and_then(|jar| {
            jar.header_value(parsed.host_str().unwrap_or_default(), parsed.path())
        });

        let mut builder = self.client.get(parsed).timeout(timeout);
        if let Some(params) = params {
            builder = builder.query(params);
        }
        if let Some(value) = cookie_header {
            builder = builder.header(COOKIE, value);
        }

        debug!("GET {}", url);
        builder.send().map_err(SyncError::from_transport)
    }
}

impl Drop for SessionClient {
    fn drop(&mut self) {
        debug!("Closing HTTP session");
    }
}

fn ensure_success(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    Err(SyncError::Http {
        status: status.as_u16(),
        reason: status.canonical_reason().unwrap_or("Unknown").to_string(),
    })
}

fn read_json<T: DeserializeOwned>(response: Response) -> Result<T> {
    let bytes = response.bytes().map_err(SyncError::from_transport)?;
    Ok(serde_json::from_slice(&bytes)?)
}

// 阻塞读取超时时，reqwest 把超时错误包在 ErrorKind::Other 里
fn body_read_error(e: io::Error) -> SyncError {
    let timed_out = e.kind() == ErrorKind::TimedOut
        || e
            .get_ref()
            .and_then(|inner| inner.downcast_ref::<reqwest::Error>())
            .map_or(false, reqwest::Error::is_timeout);

    if timed_out {
        SyncError::Timeout
    } else {
        SyncError::IoError(e)
    }
}

/// "https://host/a/b/file.csv?x=1" -> "file.csv"
pub fn file_name_from_url(url: &str) -> Result<String> {
    let parsed = Url::parse(url).map_err(|e| SyncError::InvalidUrl(format!("{}: {}", url, e)))?;

    parsed
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .filter(|name| !name.is_empty())
        .map(|name| name.to_string())
        .ok_or_else(|| SyncError::InvalidUrl(format!("{} has no file name", url)))
}
