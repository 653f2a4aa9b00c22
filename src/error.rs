use thiserror::Error;

/// 全局错误类型
///
/// 分型沿用回测阶段的约定：
/// - Transport：网络/超时，只中止当前候选
/// - Rejected：服务端明确拒绝（非成功状态码），不重试
/// - Protocol：响应缺少预期字段，按候选失败处理
#[derive(Error, Debug)]
pub enum WqbError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("rejected by service (HTTP {status}): {message}")]
    Rejected { status: u16, message: String },
    #[error("protocol error: {0}")]
    Protocol(String),
    #[error("cancelled")]
    Cancelled,
    #[error("storage error: {0}")]
    Storage(#[from] sea_orm::DbErr),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("config error: {0}")]
    Config(String),
}

impl WqbError {
    pub fn rejected(status: u16, message: impl Into<String>) -> Self {
        Self::Rejected {
            status,
            message: message.into(),
        }
    }

    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol(message.into())
    }

    /// 网络类错误可以在上层重试，其余均为终态
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}

impl From<reqwest::Error> for WqbError {
    fn from(e: reqwest::Error) -> Self {
        Self::Transport(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, WqbError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_transport_errors_are_retryable() {
        assert!(WqbError::Transport("timeout".into()).is_retryable());
        assert!(!WqbError::rejected(403, "forbidden").is_retryable());
        assert!(!WqbError::protocol("missing alpha").is_retryable());
        assert!(!WqbError::Cancelled.is_retryable());
    }

    #[test]
    fn rejected_message_includes_status() {
        let e = WqbError::rejected(400, "bad expression");
        assert!(e.to_string().contains("400"));
        assert!(e.to_string().contains("bad expression"));
    }
}
