use super::auto_auth_session::AutoAuthSession;
use super::urls::ApiUrls;
use crate::error::Result;
use base64::Engine;
use log::info;
use reqwest::{Method, Response, StatusCode};
use std::collections::HashMap;

/// WQB Session - WorldQuant BRAIN 平台的会话
///
/// 基于 AutoAuthSession，提供 WorldQuant BRAIN 平台的 API 方法。
/// 认证在进程生命周期内建立一次，之后由 cookie 维持，过期时自动重新认证。
pub struct WQBSession {
    session: AutoAuthSession,
    urls: ApiUrls,
    email: String,
}

impl WQBSession {
    /// 创建一个新的 WQBSession
    ///
    /// # 参数
    ///
    /// * `email` - 邮箱地址
    /// * `password` - 密码
    /// * `urls` - API 地址（默认官方地址）
    pub fn new(email: String, password: String, urls: ApiUrls) -> Result<Self> {
        let auth_expected = Box::new(|resp: &Response| {
            resp.status() == StatusCode::CREATED || resp.status() == StatusCode::OK
        });
        // 只有 401 触发重新认证后重发，其余状态码交给调用方处理
        let expected = Box::new(|resp: &Response| resp.status() != StatusCode::UNAUTHORIZED);

        let mut auth_headers = HashMap::new();
        auth_headers.insert(
            "Authorization".to_string(),
            format!(
                "Basic {}",
                base64::engine::general_purpose::STANDARD.encode(format!("{}:{}", email, password))
            ),
        );

        let mut session = AutoAuthSession::new(
            Method::POST,
            urls.authentication(),
            auth_expected,
            3,
            2.0,
            expected,
            3,
            2.0,
        )?;
        session.set_auth_headers(auth_headers);

        Ok(Self {
            session,
            urls,
            email,
        })
    }

    /// 执行认证请求（用于测试连接）
    pub async fn auth_request(&self) -> Result<Response> {
        self.session.auth_request().await
    }

    /// 提交模拟
    pub async fn create_simulation(&self, payload: &serde_json::Value) -> Result<Response> {
        let url = self.urls.simulations();
        let resp = self
            .session
            .request(|client| client.post(&url).json(payload))
            .await?;
        info!("{} create_simulation(...) [{}]", self, resp.status());
        Ok(resp)
    }

    /// 按绝对或相对地址 GET（模拟进度资源）
    pub async fn get_location(&self, location: &str) -> Result<Response> {
        let url = self.urls.resolve(location);
        self.session.get(&url).await
    }

    /// 定位 Alpha
    pub async fn locate_alpha(&self, alpha_id: &str) -> Result<Response> {
        let url = self.urls.alpha(alpha_id);
        let resp = self.session.get(&url).await?;
        info!("{} locate_alpha(...) [{}]", self, url);
        Ok(resp)
    }

    /// 提交 Alpha
    pub async fn request_submit(&self, alpha_id: &str) -> Result<Response> {
        let url = self.urls.alpha_submit(alpha_id);
        let resp = self.session.post(&url).await?;
        info!("{} request_submit(...) [{}]", self, url);
        Ok(resp)
    }

    /// 查询 Alpha 提交状态
    pub async fn check_submission(&self, alpha_id: &str) -> Result<Response> {
        let url = self.urls.alpha_submit(alpha_id);
        self.session.get(&url).await
    }

    /// 搜索数据集下的字段（有限制）
    pub async fn search_fields_limited(
        &self,
        region: &str,
        delay: i32,
        universe: &str,
        dataset_id: &str,
        limit: Option<usize>,
        offset: Option<usize>,
    ) -> Result<Response> {
        let limit = limit.unwrap_or(50).clamp(1, 50);
        let offset = offset.unwrap_or(0).min(10000 - limit);

        let params = [
            "instrumentType=EQUITY".to_string(),
            format!("region={}", region),
            format!("delay={}", delay),
            format!("universe={}", universe),
            format!("dataset.id={}", dataset_id),
            format!("limit={}", limit),
            format!("offset={}", offset),
        ];

        let url = format!("{}?{}", self.urls.data_fields(), params.join("&"));
        let resp = self.session.get(&url).await?;
        info!("{} search_fields_limited(...) [{}]", self, url);
        Ok(resp)
    }
}

impl std::fmt::Display for WQBSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "<WQBSession [{}]>", self.email)
    }
}

impl std::fmt::Debug for WQBSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "<WQBSession [{}]>", self.email)
    }
}
