// ==========================================
// 智能配送路由系统 - 地理编码错误类型
// ==========================================
// 说明: NotFound 与 ProviderError 必须可区分
// NotFound      - 服务正常响应但无匹配
// ProviderError - 超时/限流/HTTP/网络/解析/凭证,均为瞬时失败
// 两者都进入同一降级链,不直接展示给操作员
// ==========================================

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GeocodeError {
    #[error("未找到匹配地址 ({provider}): {query}")]
    NotFound { provider: String, query: String },

    // ===== ProviderError =====
    #[error("请求超时 ({provider})")]
    Timeout { provider: String },

    #[error("请求被限流 ({provider})")]
    Throttled { provider: String },

    #[error("HTTP 错误 ({provider}): status={status}")]
    HttpStatus { provider: String, status: u16 },

    #[error("网络错误 ({provider}): {message}")]
    Transport { provider: String, message: String },

    #[error("响应解析失败 ({provider}): {message}")]
    Decode { provider: String, message: String },

    #[error("缺少 API Key ({provider})")]
    MissingCredential { provider: String },

    #[error("HTTP 客户端初始化失败 ({provider}): {message}")]
    ClientInit { provider: String, message: String },
}

impl GeocodeError {
    pub fn not_found(provider: &str, query: &str) -> Self {
        GeocodeError::NotFound {
            provider: provider.to_string(),
            query: query.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, GeocodeError::NotFound { .. })
    }

    pub fn is_provider_error(&self) -> bool {
        !self.is_not_found()
    }

    /// 出错的服务名称
    pub fn provider(&self) -> &str {
        match self {
            GeocodeError::NotFound { provider, .. }
            | GeocodeError::Timeout { provider }
            | GeocodeError::Throttled { provider }
            | GeocodeError::HttpStatus { provider, .. }
            | GeocodeError::Transport { provider, .. }
            | GeocodeError::Decode { provider, .. }
            | GeocodeError::MissingCredential { provider }
            | GeocodeError::ClientInit { provider, .. } => provider,
        }
    }

    /// reqwest 错误归类
    pub fn from_reqwest(provider: &str, err: reqwest::Error) -> Self {
        let provider = provider.to_string();
        if err.is_timeout() {
            GeocodeError::Timeout { provider }
        } else if err.is_decode() {
            GeocodeError::Decode {
                provider,
                message: err.to_string(),
            }
        } else if let Some(status) = err.status() {
            GeocodeError::from_status(&provider, status.as_u16())
        } else {
            GeocodeError::Transport {
                provider,
                message: err.to_string(),
            }
        }
    }

    /// 非 2xx 状态码归类(429 视为限流)
    pub fn from_status(provider: &str, status: u16) -> Self {
        let provider = provider.to_string();
        if status == 429 {
            GeocodeError::Throttled { provider }
        } else {
            GeocodeError::HttpStatus { provider, status }
        }
    }
}

pub type GeocodeResult<T> = Result<T, GeocodeError>;
