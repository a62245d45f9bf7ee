// 导出服务器相关模块
pub mod web;

pub use web::{build_router, start_web_server};
