use crate::error::Result;
use log::{debug, info, warn};
use reqwest::{Client, Method, RequestBuilder, Response};
use std::collections::HashMap;
use std::time::Duration;

pub type ResponsePredicate = Box<dyn Fn(&Response) -> bool + Send + Sync>;

/// 自动认证会话
///
/// 封装 HTTP 客户端，提供自动认证功能。
/// 当请求结果不符合预期（如 401）时，会等待后重新认证再重试。
pub struct AutoAuthSession {
    client: Client,
    auth_method: Method,
    auth_url: String,
    auth_expected: ResponsePredicate,
    auth_max_tries: usize,
    auth_delay_unexpected: Duration,
    expected: ResponsePredicate,
    max_tries: usize,
    delay_unexpected: Duration,
    auth_headers: HashMap<String, String>,
}

impl AutoAuthSession {
    /// 创建一个新的 AutoAuthSession
    ///
    /// # 参数
    ///
    /// * `auth_method` - 认证请求方法（如 POST）
    /// * `auth_url` - 认证 URL
    /// * `auth_expected` - 判断认证是否成功的函数
    /// * `auth_max_tries` - 认证最大重试次数
    /// * `auth_delay_unexpected` - 认证失败时的延迟时间（秒）
    /// * `expected` - 判断普通请求是否成功的函数
    /// * `max_tries` - 普通请求最大重试次数
    /// * `delay_unexpected` - 普通请求失败时的延迟时间（秒）
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        auth_method: Method,
        auth_url: String,
        auth_expected: ResponsePredicate,
        auth_max_tries: usize,
        auth_delay_unexpected: f64,
        expected: ResponsePredicate,
        max_tries: usize,
        delay_unexpected: f64,
    ) -> Result<Self> {
        let client = Client::builder()
            .cookie_store(true)
            .timeout(Duration::from_secs(30))
            .user_agent("wqbatch/0.1")
            .build()?;

        Ok(Self {
            client,
            auth_method,
            auth_url,
            auth_expected,
            auth_max_tries: auth_max_tries.max(1),
            auth_delay_unexpected: Duration::from_secs_f64(auth_delay_unexpected.max(0.0)),
            expected,
            max_tries: max_tries.max(1),
            delay_unexpected: Duration::from_secs_f64(delay_unexpected.max(0.0)),
            auth_headers: HashMap::new(),
        })
    }

    /// 设置认证请求头
    pub fn set_auth_headers(&mut self, headers: HashMap<String, String>) {
        self.auth_headers = headers;
    }

    /// 执行认证请求
    pub async fn auth_request(&self) -> Result<Response> {
        let mut tries = 0;
        loop {
            tries += 1;
            let mut request = self
                .client
                .request(self.auth_method.clone(), &self.auth_url);
            for (key, value) in &self.auth_headers {
                request = request.header(key, value);
            }

            let resp = request.send().await?;
            if (self.auth_expected)(&resp) {
                info!("{} auth_request(...) [{} tries]", self, tries);
                return Ok(resp);
            }
            if tries >= self.auth_max_tries {
                warn!("{} auth_request(...) [max {} tries ran out]", self, tries);
                return Ok(resp);
            }
            tokio::time::sleep(self.auth_delay_unexpected).await;
        }
    }

    /// 执行 HTTP 请求（带自动认证）
    ///
    /// # 参数
    ///
    /// * `builder` - 一个闭包，接收 Client 并返回 RequestBuilder
    pub async fn request<F>(&self, builder: F) -> Result<Response>
    where
        F: Fn(&Client) -> RequestBuilder,
    {
        self.request_with_retry(builder, None, None).await
    }

    /// 执行 HTTP 请求（带重试和自动认证）
    ///
    /// 不符合预期时先等待，再重新认证，然后重试；
    /// 次数用完后把最后一次响应原样返回给调用方判断。
    pub async fn request_with_retry<F>(
        &self,
        builder: F,
        max_tries: Option<usize>,
        delay_unexpected: Option<Duration>,
    ) -> Result<Response>
    where
        F: Fn(&Client) -> RequestBuilder,
    {
        let max_tries = max_tries.unwrap_or(self.max_tries).max(1);
        let delay_unexpected = delay_unexpected.unwrap_or(self.delay_unexpected);

        let mut tries = 0;
        loop {
            tries += 1;
            let resp = builder(&self.client).send().await?;

            if (self.expected)(&resp) {
                debug!("{} request(...) [{} tries]", self, tries);
                return Ok(resp);
            }
            if tries >= max_tries {
                warn!(
                    "{} request(...) [max {} tries ran out, HTTP {}]",
                    self,
                    tries,
                    resp.status()
                );
                return Ok(resp);
            }

            tokio::time::sleep(delay_unexpected).await;
            if let Err(e) = self.auth_request().await {
                warn!("{} 重新认证失败: {}", self, e);
            }
        }
    }

    /// GET 请求
    pub async fn get(&self, url: &str) -> Result<Response> {
        self.request(|client| client.get(url)).await
    }

    /// POST 请求
    pub async fn post(&self, url: &str) -> Result<Response> {
        self.request(|client| client.post(url)).await
    }
}

impl std::fmt::Display for AutoAuthSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "<AutoAuthSession [{}]>", self.auth_url)
    }
}

impl std::fmt::Debug for AutoAuthSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "<AutoAuthSession [{}]>", self.auth_url)
    }
}
