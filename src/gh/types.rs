//! 共享 HTTP 类型与响应处理

use serde::Deserialize;

/// 服务器结构化错误响应体
///
/// github-utils 服务端出错时返回 `{"message": "..."}`，个别版本用 `error` 字段
#[derive(Debug, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl ErrorBody {
    /// 取出服务器给出的错误信息（message 优先）
    pub fn into_message(self) -> Option<String> {
        self.message.or(self.error)
    }
}

/// 通用操作结果响应（`{"message": "..."}`）
#[derive(Debug, Clone, Deserialize)]
pub struct MessageResp {
    #[serde(default)]
    pub message: String,
}

/// 通用 HTTP 响应处理函数：直接反序列化为目标结构体
///
/// 非 2xx 时优先解析结构化错误体并携带服务器给出的 message，
/// 解析不了则回退为通用错误信息。所有 API 都可以共用此方法。
pub async fn handle_http_response<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
    operation_name: &str,
) -> anyhow::Result<T> {
    use anyhow::Context;
    use tracing::{debug, error};

    let status = response.status();

    // 读取 body bytes（只能读取一次）
    let body_bytes = response.bytes().await.context("读取响应 body 失败")?;
    let body_str = String::from_utf8_lossy(&body_bytes);
    debug!("[HTTP] {}响应 Body: {}", operation_name, body_str);

    if !status.is_success() {
        let server_msg = serde_json::from_slice::<ErrorBody>(&body_bytes)
            .ok()
            .and_then(ErrorBody::into_message);
        error!(
            "[HTTP] {}请求失败，HTTP状态: {}, 响应: {}",
            operation_name, status, body_str
        );
        return Err(match server_msg {
            Some(msg) => anyhow::anyhow!("{}", msg),
            None => anyhow::anyhow!("HTTP 错误 {}: {}", status, body_str),
        });
    }
    debug!("[HTTP] {}请求成功，HTTP状态: {}", operation_name, status);

    // 从 bytes 反序列化（因为 body 已经被消费了）
    let parsed: T = serde_json::from_slice(&body_bytes).map_err(|e| {
        error!(
            "[HTTP] {}反序列化失败: {:?}\n原始响应: {}",
            operation_name, e, body_str
        );
        anyhow::anyhow!("反序列化响应失败: {:?}", e)
    })?;

    Ok(parsed)
}

/// 读取二进制导出响应（文件内容）
///
/// 导出类接口返回 CSV/JSON 文件体，只校验状态码，不做反序列化
pub async fn handle_blob_response(
    response: reqwest::Response,
    operation_name: &str,
) -> anyhow::Result<Vec<u8>> {
    use anyhow::Context;
    use tracing::{debug, error};

    let status = response.status();
    let body_bytes = response.bytes().await.context("读取响应 body 失败")?;

    if !status.is_success() {
        let body_str = String::from_utf8_lossy(&body_bytes);
        let server_msg = serde_json::from_slice::<ErrorBody>(&body_bytes)
            .ok()
            .and_then(ErrorBody::into_message);
        error!(
            "[HTTP] {}请求失败，HTTP状态: {}, 响应: {}",
            operation_name, status, body_str
        );
        return Err(match server_msg {
            Some(msg) => anyhow::anyhow!("{}", msg),
            None => anyhow::anyhow!("HTTP 错误 {}: {}", status, body_str),
        });
    }

    debug!(
        "[HTTP] {}导出成功，{} 字节",
        operation_name,
        body_bytes.len()
    );
    Ok(body_bytes.to_vec())
}
