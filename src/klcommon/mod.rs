// 导出共享模块
pub mod api;
pub mod config;
pub mod error;
pub mod logging_setup;
pub mod models;

// 重新导出常用类型，方便使用
pub use api::{BinanceApi, MarketDataSource};
pub use config::AppConfig;
pub use error::{AppError, Result};
pub use models::{Candle, CandleSeries, ExchangeInfo, SentimentRatio, SymbolInfo};
