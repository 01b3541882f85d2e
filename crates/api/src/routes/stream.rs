//! # WebSocket 实时流路由控制器
//!
//! 把内部收盘事件广播转发给 WebSocket 订阅者。单向推送通道：
//! 服务端不解析客户端文本帧，只响应关闭帧。

use axum::extract::State;
use axum::extract::ws::{Message, Utf8Bytes, WebSocket, WebSocketUpgrade};
use axum::response::Response;
use futures::StreamExt;
use tracing::{debug, warn};

use crate::server::AppState;
use crate::types::StreamEvent;
use souba_core::market::port::MarketService;

/// 订阅收盘事件流
///
/// 升级为 WebSocket 后，每当任一被监控序列的槽位收盘，推送一帧
/// `StreamEvent` JSON 文本。尽力而为、至多一次：迟到订阅者收不到
/// 历史事件，必须通过区间查询接口补齐。
#[utoipa::path(
    get,
    path = "/api/v1/market/stream",
    tag = "行情 (Market)",
    responses(
        (status = 101, description = "协议升级为 WebSocket，此后推送 StreamEvent 帧")
    )
)]
pub async fn stream_candles(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(mut socket: WebSocket, state: AppState) {
    let mut events = state.market.subscribe();
    debug!("websocket subscriber connected");

    loop {
        tokio::select! {
            event = events.next() => {
                let Some(event) = event else {
                    // 广播器关闭，服务停机
                    break;
                };
                let frame = StreamEvent::from(event);
                let payload = match serde_json::to_string(&frame) {
                    Ok(json) => json,
                    Err(e) => {
                        warn!("failed to encode stream event: {}", e);
                        continue;
                    }
                };
                if socket.send(Message::Text(Utf8Bytes::from(payload))).await.is_err() {
                    break;
                }
            }
            msg = socket.recv() => {
                match msg {
                    // 入站文本/二进制帧一律忽略
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    Some(Ok(_)) => {}
                }
            }
        }
    }
    debug!("websocket subscriber disconnected");
}
