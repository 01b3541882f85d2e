//! # Souba Core
//!
//! 领域核心：实体、端口 (Trait)、错误与全局配置的唯一定义处。
//! 本 crate 不包含任何具体实现（无 SQL、无 HTTP、无随机数引擎），
//! 上层 adapter crate 只能通过这里声明的契约互相协作。

pub mod common;
pub mod config;
pub mod market;
pub mod notify;
pub mod store;
