//! # `souba-api` - HTTP API 网关
//!
//! 本 crate 是 Souba 确定性行情服务的 HTTP/WebSocket 入口。
//! 使用 `axum` 构建路由与控制器，通过 `utoipa` 自动生成 OpenAPI 3.0 Swagger 文档。
//!
//! ## 架构职责
//! - 接收来自图表客户端或浏览器的 HTTP 请求
//! - 调用下层 `MarketService` 完成区间查询、部分 K 线插值与手动提交
//! - 将领域模型转换为 DTO 返回给前端
//! - 把收盘事件广播转发到 WebSocket 订阅者

pub mod error;
pub mod routes;
pub mod server;
pub mod types;
