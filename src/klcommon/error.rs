use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("数据不足: 需要至少 {needed} 个数据点, 实际 {actual} 个")]
    InsufficientData { needed: usize, actual: usize },

    #[error("上游数据获取失败: {0}")]
    UpstreamFetchError(String),

    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("信号未通过校验: {0}")]
    ValidationRejected(String),

    #[error("通知发送失败: {0}")]
    DispatchFailure(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Data error: {0}")]
    DataError(String),

    #[error("扫描请求被拒绝: {0}")]
    ScanRejected(String),

    #[error("Web server error: {0}")]
    WebServerError(String),
}

impl AppError {
    /// 获取错误类型的简洁摘要，作为结构化日志中 `error.summary` 字段的稳定取值
    pub fn get_error_type_summary(&self) -> &'static str {
        match self {
            // 指标计算
            AppError::InsufficientData { .. } => "indicator_data_insufficient",

            // 行情数据获取
            AppError::UpstreamFetchError(_) => "market_data_acquisition_failed",
            AppError::HttpError(_) => "market_data_connection_failed",
            AppError::JsonError(_) => "market_data_parsing_failed",
            AppError::DataError(_) => "market_data_validation_failed",

            // 信号过滤与推送
            AppError::ValidationRejected(_) => "signal_validation_rejected",
            AppError::DispatchFailure(_) => "signal_notification_failed",

            // 运行控制
            AppError::ScanRejected(_) => "scan_request_rejected",

            // 系统资源与配置
            AppError::IoError(_) => "signal_file_operation_failed",
            AppError::ConfigError(_) => "signal_service_configuration_invalid",
            AppError::WebServerError(_) => "signal_api_server_failed",
        }
    }

    /// 是否属于上游数据源（行情接口）的失败，这类错误只会跳过当前交易对
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            AppError::UpstreamFetchError(_)
                | AppError::HttpError(_)
                | AppError::JsonError(_)
                | AppError::DataError(_)
        )
    }

    /// 检查错误是否为可重试类型
    pub fn is_retryable(&self) -> bool {
        match self {
            // 网络相关错误通常可重试
            AppError::HttpError(_)
            | AppError::UpstreamFetchError(_)
            | AppError::DispatchFailure(_)
            | AppError::IoError(_) => true,

            // 扫描正在进行或已暂停，稍后再试即可
            AppError::ScanRejected(_) => true,

            // 数据或配置层面的问题，重试不会改变结果
            AppError::InsufficientData { .. }
            | AppError::JsonError(_)
            | AppError::DataError(_)
            | AppError::ValidationRejected(_)
            | AppError::ConfigError(_)
            | AppError::WebServerError(_) => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
