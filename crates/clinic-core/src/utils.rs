//! 通用工具函数

use chrono::{DateTime, Utc};

/// 将原始体征数值规整为“已测量 / 未测量”
///
/// 0、负数和非有限值都表示未测量。
pub fn sanitize_vital(value: f64) -> Option<f64> {
    if value.is_finite() && value > 0.0 {
        Some(value)
    } else {
        None
    }
}

/// 解析表单中的体征字段，空白或无法解析时视为未测量
pub fn parse_vital_field(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    match trimmed.parse::<f64>() {
        Ok(value) => sanitize_vital(value),
        Err(_) => {
            tracing::debug!("Ignoring unparsable vital field {:?}", raw);
            None
        }
    }
}

/// 两个时间点之间的整分钟数，不会为负
pub fn minutes_between(from: DateTime<Utc>, to: DateTime<Utc>) -> i64 {
    to.signed_duration_since(from).num_minutes().max(0)
}
