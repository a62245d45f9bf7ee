// 导出模块
pub mod engine;
pub mod klcommon;
pub mod klserver;
pub mod notify;
pub mod scheduler;
pub mod service;

// Re-export error types
pub use klcommon::error::AppError;
