//! HTML and JSON parsing for console pages.
//!
//! Everything here depends on the console's current markup.

use once_cell::sync::Lazy;
use regex_lite::Regex;
use serde_json::Value;

use super::{CodePayload, ConnectionMethod, ConnectionStatus, ConsoleError, DeviceEntry};

static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").unwrap());
static CSRF_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"name="_token"\s+value="([^"]+)"|name="csrf-token"\s+content="([^"]+)""#)
        .unwrap()
});
static DEVICE_LIST_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?s)id="botsList"[^>]*>(.*?)</ul>"#).unwrap());
static ITEM_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<li\b(.*?)</li>").unwrap());
static DEVICE_ID_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"updateBotSetting\(\s*(\d+)\s*,|data-bot-id="(\d+)""#).unwrap()
});
static STATUS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"<span[^>]*class="[^"]*inline-flex[^"]*"[^>]*>([^<]*)</span>"#).unwrap());
static SENT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?:Terkirim|Sent):\s*(\d+)").unwrap());
static PHONE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\+?\d[\d \-]{7,}\d").unwrap());

/// Strip tags and collapse whitespace.
pub(crate) fn visible_text(html: &str) -> String {
    let text = TAG_RE.replace_all(html, " ");
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Extract the login challenge text from the login page.
pub(crate) fn challenge_text(login_page: &str) -> Result<String, ConsoleError> {
    let text = visible_text(login_page);
    if text.contains("= ?") || text.contains("=?") {
        Ok(text)
    } else {
        Err(ConsoleError::UnexpectedPage(
            "login page carries no challenge".to_string(),
        ))
    }
}

/// CSRF token embedded in a form, if the console uses one.
pub(crate) fn csrf_token(html: &str) -> Option<String> {
    CSRF_RE.captures(html).and_then(|caps| {
        caps.get(1)
            .or_else(|| caps.get(2))
            .map(|m| m.as_str().to_string())
    })
}

/// Parse the device list on the devices page.
///
/// Entries without a recognizable id are skipped.
pub(crate) fn device_list(html: &str) -> Vec<DeviceEntry> {
    let Some(list) = DEVICE_LIST_RE.captures(html) else {
        return Vec::new();
    };

    ITEM_RE
        .captures_iter(&list[1])
        .filter_map(|item| parse_device(&item[1]))
        .collect()
}

fn parse_device(item: &str) -> Option<DeviceEntry> {
    let id_caps = DEVICE_ID_RE.captures(item)?;
    let external_id = id_caps.get(1).or_else(|| id_caps.get(2))?.as_str().to_string();

    let status = STATUS_RE
        .captures(item)
        .map(|caps| ConnectionStatus::from_label(&caps[1]))
        .unwrap_or(ConnectionStatus::Pending);

    let text = visible_text(item);
    let sent_count = SENT_RE
        .captures(&text)
        .and_then(|caps| caps[1].parse::<u64>().ok());
    let phone_number = PHONE_RE.find(&text).map(|m| {
        m.as_str()
            .chars()
            .filter(|c| c.is_ascii_digit() || *c == '+')
            .collect::<String>()
    });

    Some(DeviceEntry {
        external_id,
        phone_number,
        status,
        sent_count,
    })
}

/// Decode the add-device API response: `{"error":"0","msg":"...","session":"..."}`.
pub(crate) fn code_response(
    body: &str,
    method: &ConnectionMethod,
) -> Result<CodePayload, ConsoleError> {
    let value: Value = serde_json::from_str(body)
        .map_err(|e| ConsoleError::UnexpectedPage(format!("code response is not JSON: {}", e)))?;

    let ok = match value.get("error") {
        Some(Value::String(s)) => s == "0",
        Some(Value::Number(n)) => n.as_i64() == Some(0),
        Some(Value::Bool(b)) => !b,
        _ => false,
    };
    let msg = value
        .get("msg")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .trim();

    if !ok || msg.is_empty() {
        let reason = if msg.is_empty() {
            "console returned no code".to_string()
        } else {
            msg.to_string()
        };
        return Err(ConsoleError::Rejected(reason));
    }

    Ok(match method {
        ConnectionMethod::Qr => CodePayload::Qr {
            image: msg.to_string(),
        },
        ConnectionMethod::Pairing { .. } => CodePayload::pairing(msg),
    })
}
