use serde::{Deserialize, Deserializer};
use tracing::error;

/// 反序列化数组字段，处理 null 值
pub(crate) fn deserialize_vec_or_null<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    let opt = Option::<Vec<T>>::deserialize(deserializer)?;
    Ok(opt.unwrap_or_default())
}

/// 当前时间（毫秒时间戳）
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// 文档集合查询响应：documents 里的每个元素按原始 JSON 返回，
/// 由调用方逐个宽松解析（坏文档跳过，不影响整批）
#[derive(Debug, Deserialize)]
pub struct DocQueryResp {
    #[serde(default, deserialize_with = "deserialize_vec_or_null")]
    pub documents: Vec<serde_json::Value>,
}

/// 统一的 API 响应包装结构体（包含 errCode、errMsg、data）
/// data 字段可能为 null 或缺失，因此使用 Option<T>
/// serde 会自动将缺失或 null 的字段反序列化为 None
#[derive(Debug, Deserialize)]
pub struct ApiResponse<T> {
    #[serde(rename = "errCode")]
    pub err_code: i32,
    #[serde(rename = "errMsg")]
    pub err_msg: String,
    pub data: Option<T>,
}

/// 通用 HTTP 响应处理函数：直接反序列化为统一的响应结构体
/// 返回 `ApiResponse<T>`，调用方可以根据需要处理 `data` 字段（可能为 None）
/// 所有 API 都可以共用此方法
pub async fn handle_http_response<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
    operation_name: &str,
) -> anyhow::Result<ApiResponse<T>> {
    use anyhow::Context;
    use tracing::{debug, error};

    let status = response.status();

    // 读取 body bytes（只能读取一次）
    let body_bytes = response.bytes().await.context("读取响应 body 失败")?;
    let body_str = String::from_utf8_lossy(&body_bytes);
    debug!("[HTTP] {}响应 Body: {}", operation_name, body_str);

    if !status.is_success() {
        error!(
            "[HTTP] {}请求失败，HTTP状态: {}, 响应: {}",
            operation_name, status, body_str
        );
        return Err(anyhow::anyhow!("HTTP 错误 {}: {}", status, body_str));
    }
    debug!("[HTTP] {}请求成功，HTTP状态: {}", operation_name, status);

    // 从 bytes 反序列化（因为 body 已经被消费了）
    let api_resp: ApiResponse<T> = serde_json::from_slice(&body_bytes).map_err(|e| {
        error!(
            "[HTTP] {}反序列化失败: {:?}\n原始响应: {}",
            operation_name, e, body_str
        );
        anyhow::anyhow!("反序列化响应失败: {:?}", e)
    })?;

    // 检查错误码
    if api_resp.err_code != 0 {
        error!(
            "[HTTP] {}服务器错误，错误码: {}, 错误信息: {}",
            operation_name, api_resp.err_code, api_resp.err_msg
        );
        return Err(anyhow::anyhow!(
            "服务器错误 {}: {}",
            api_resp.err_code,
            api_resp.err_msg
        ));
    }

    Ok(api_resp)
}

/// 逐个解析查询返回的文档，解析失败的文档跳过，不让整批失败
pub fn decode_documents<T: serde::de::DeserializeOwned>(
    documents: Vec<serde_json::Value>,
    operation_name: &str,
) -> Vec<T> {
    documents
        .into_iter()
        .filter_map(|doc| match serde_json::from_value::<T>(doc.clone()) {
            Ok(item) => Some(item),
            Err(e) => {
                error!(
                    "[HTTP] {}解析文档失败，已跳过: {:?}, 数据: {}",
                    operation_name, e, doc
                );
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hole::post::models::Post;
    use serde_json::json;

    #[test]
    fn api_response_tolerates_missing_data() {
        let resp: ApiResponse<DocQueryResp> =
            serde_json::from_str(r#"{"errCode":0,"errMsg":""}"#).unwrap();
        assert_eq!(resp.err_code, 0);
        assert!(resp.data.is_none());

        let resp: ApiResponse<DocQueryResp> =
            serde_json::from_str(r#"{"errCode":0,"errMsg":"","data":null}"#).unwrap();
        assert!(resp.data.is_none());

        let resp: ApiResponse<DocQueryResp> =
            serde_json::from_str(r#"{"errCode":0,"errMsg":"","data":{"documents":null}}"#).unwrap();
        assert!(resp.data.unwrap().documents.is_empty());
    }

    #[test]
    fn decode_documents_skips_bad_entries() {
        let docs = vec![
            json!({"id": "p1", "content": "第一条", "authorId": "", "createdAt": 1}),
            json!(42),
            json!({"id": "p2", "content": "第二条", "tags": ["心情"]}),
        ];
        let posts: Vec<Post> = decode_documents(docs, "帖子列表");
        assert_eq!(posts.len(), 2);
        assert_eq!(posts[0].id, "p1");
        assert_eq!(posts[1].tags, vec!["心情".to_string()]);
        // 缺失字段按默认值补齐
        assert_eq!(posts[1].author_name, "匿名用户");
    }
}
