//! 导入导出载荷编解码：CSV 与 JSON 两种格式
//!
//! CSV 约定：`login` 表头 + 每行一个用户名。
//! JSON 约定：`{users: [...]}`、`{name, items}`（单列表）、`{lists: [...]}`（多列表）。

use crate::gh::lists::models::SavedList;
use anyhow::{Context, Result};
use serde::Deserialize;

/// 把 login 序列编码为 CSV（`login` 表头 + 每行一个）
pub fn logins_to_csv(logins: &[String]) -> String {
    let mut out = String::from("login\n");
    for login in logins {
        out.push_str(login);
        out.push('\n');
    }
    out
}

/// 解析 CSV：表头可选，跳过空行，去除首尾空白
pub fn logins_from_csv(text: &str) -> Vec<String> {
    let mut logins = Vec::new();
    for (idx, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if idx == 0 && line.eq_ignore_ascii_case("login") {
            continue;
        }
        logins.push(line.to_string());
    }
    dedup_preserve_order(&logins)
}

/// 去重并保留首次出现顺序
pub fn dedup_preserve_order(items: &[String]) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::with_capacity(items.len());
    for item in items {
        if seen.insert(item.clone()) {
            out.push(item.clone());
        }
    }
    out
}

/// 当前时间的 ISO 8601（RFC 3339）字符串
pub fn now_iso() -> String {
    chrono::Utc::now().to_rfc3339()
}

/// 生成客户端唯一 ID
pub fn generate_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// `users` 数组元素：既可以是纯字符串，也可以是带 login 字段的对象
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum UserRef {
    Login(String),
    User { login: String },
}

impl UserRef {
    pub fn into_login(self) -> String {
        match self {
            UserRef::Login(login) => login,
            UserRef::User { login } => login,
        }
    }
}

/// 视图层导入载荷的解析结果
#[derive(Debug, Clone)]
pub enum ImportPayload {
    /// 单列表（`{name, items}` 或 `{users: [...]}`），导入后成为激活列表
    SingleList { name: String, items: Vec<String> },
    /// 多列表（`{lists: [...]}`），逐个落盘、不激活
    MultiList(Vec<SavedList>),
}

/// 解析导入 JSON 载荷
///
/// 格式错误直接报错，调用方中止导入，不产生部分状态
pub fn parse_import_payload(json: &str) -> Result<ImportPayload> {
    let value: serde_json::Value = serde_json::from_str(json).context("解析导入 JSON 失败")?;

    if let Some(lists) = value.get("lists") {
        let lists: Vec<SavedList> =
            serde_json::from_value(lists.clone()).context("解析载荷中的 lists 失败")?;
        return Ok(ImportPayload::MultiList(lists));
    }

    if let Some(users) = value.get("users") {
        let users: Vec<UserRef> =
            serde_json::from_value(users.clone()).context("解析载荷中的 users 失败")?;
        let items = dedup_preserve_order(
            &users.into_iter().map(UserRef::into_login).collect::<Vec<_>>(),
        );
        let name = value
            .get("name")
            .and_then(|n| n.as_str())
            .unwrap_or("imported-users")
            .to_string();
        return Ok(ImportPayload::SingleList { name, items });
    }

    if value.get("name").is_some() && value.get("items").is_some() {
        #[derive(Deserialize)]
        struct ListPayload {
            name: String,
            items: Vec<String>,
        }
        let payload: ListPayload =
            serde_json::from_value(value).context("解析单列表载荷失败")?;
        return Ok(ImportPayload::SingleList {
            name: payload.name,
            items: dedup_preserve_order(&payload.items),
        });
    }

    anyhow::bail!("无法识别的导入载荷格式")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn logins(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn csv_round_trip_keeps_order() {
        let input = logins(&["alice", "bob", "carol"]);
        let csv = logins_to_csv(&input);
        assert_eq!(csv, "login\nalice\nbob\ncarol\n");
        assert_eq!(logins_from_csv(&csv), input);
    }

    #[test]
    fn csv_parse_tolerates_missing_header_and_blanks() {
        let parsed = logins_from_csv("alice\n\n  bob  \nalice\n");
        assert_eq!(parsed, logins(&["alice", "bob"]));
    }

    #[test]
    fn dedup_keeps_first_occurrence() {
        let deduped = dedup_preserve_order(&logins(&["b", "a", "b", "c", "a"]));
        assert_eq!(deduped, logins(&["b", "a", "c"]));
    }

    #[test]
    fn parse_single_list_payload() {
        let payload =
            parse_import_payload(r#"{"name":"keep","items":["alice","bob","alice"]}"#).unwrap();
        match payload {
            ImportPayload::SingleList { name, items } => {
                assert_eq!(name, "keep");
                assert_eq!(items, logins(&["alice", "bob"]));
            }
            other => panic!("期望单列表载荷，实际为 {:?}", other),
        }
    }

    #[test]
    fn parse_users_payload_accepts_objects_and_strings() {
        let payload = parse_import_payload(
            r#"{"users":["alice",{"login":"bob","avatarUrl":"x"}]}"#,
        )
        .unwrap();
        match payload {
            ImportPayload::SingleList { name, items } => {
                assert_eq!(name, "imported-users");
                assert_eq!(items, logins(&["alice", "bob"]));
            }
            other => panic!("期望单列表载荷，实际为 {:?}", other),
        }
    }

    #[test]
    fn parse_multi_list_payload() {
        let payload = parse_import_payload(
            r#"{"lists":[{"id":"1","name":"a","items":["x"],"createdAt":"t","updatedAt":"t"}]}"#,
        )
        .unwrap();
        match payload {
            ImportPayload::MultiList(lists) => {
                assert_eq!(lists.len(), 1);
                assert_eq!(lists[0].name, "a");
            }
            other => panic!("期望多列表载荷，实际为 {:?}", other),
        }
    }

    #[test]
    fn malformed_payload_is_an_error() {
        assert!(parse_import_payload("not json").is_err());
        assert!(parse_import_payload(r#"{"foo": 1}"#).is_err());
    }
}
