//! # HMS Core
//!
//! 医院运营看板的核心模块，提供急诊分诊与床位的基础数据结构、错误定义和通用工具。

pub mod complaint;
pub mod error;
pub mod fixtures;
pub mod models;
pub mod utils;

pub use error::{HmsError, Result};
pub use models::*;
