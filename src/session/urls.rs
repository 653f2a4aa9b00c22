/// WorldQuant BRAIN API 基础 URL
pub const WQB_API_URL: &str = "https://api.worldquantbrain.com";

/// 以可配置的 base 拼接各个 API 路径（测试时指向本地 mock server）
#[derive(Debug, Clone)]
pub struct ApiUrls {
    base: String,
}

impl Default for ApiUrls {
    fn default() -> Self {
        Self::new(WQB_API_URL)
    }
}

impl ApiUrls {
    pub fn new(base: impl Into<String>) -> Self {
        let base = base.into();
        Self {
            base: base.trim_end_matches('/').to_string(),
        }
    }

    /// 认证相关 URL
    pub fn authentication(&self) -> String {
        format!("{}/authentication", self.base)
    }

    /// 模拟相关 URL
    pub fn simulations(&self) -> String {
        format!("{}/simulations", self.base)
    }

    /// Alpha 相关 URL
    pub fn alpha(&self, alpha_id: &str) -> String {
        format!("{}/alphas/{}", self.base, alpha_id)
    }

    pub fn alpha_submit(&self, alpha_id: &str) -> String {
        format!("{}/alphas/{}/submit", self.base, alpha_id)
    }

    /// 数据字段相关 URL
    pub fn data_fields(&self) -> String {
        format!("{}/data-fields", self.base)
    }

    /// Location 头可能是绝对地址，也可能是相对路径
    pub fn resolve(&self, location: &str) -> String {
        if location.starts_with("http://") || location.starts_with("https://") {
            location.to_string()
        } else if location.starts_with('/') {
            format!("{}{}", self.base, location)
        } else {
            format!("{}/{}", self.base, location)
        }
    }
}
