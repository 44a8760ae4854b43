//! # Web服务模块
//!
//! 以JSON接口对外提供分诊台的医护操作、候诊队列与床位查询

pub mod error;
pub mod handlers;
pub mod server;

pub use error::{ApiError, ApiResult};
pub use server::{create_app, WebServer};
