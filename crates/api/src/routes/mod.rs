//! # 路由控制器集合

pub mod admin;
pub mod market;
pub mod stream;
pub mod system;
