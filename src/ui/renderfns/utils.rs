use crate::api::types::KeyStatus;
use chrono::{DateTime, Local, Utc};
use ratatui::prelude::Color;

/// Truncate a string to a maximum number of characters, adding "..." if truncated
pub fn truncate(s: &str, max_len: usize) -> String {
  if s.chars().count() <= max_len {
    s.to_string()
  } else {
    let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
    format!("{}...", kept)
  }
}

/// Display color for a key's status
pub fn key_status_color(status: KeyStatus) -> Color {
  match status {
    KeyStatus::Active => Color::Green,
    KeyStatus::Expired => Color::DarkGray,
    KeyStatus::Revoked => Color::Red,
  }
}

/// Remaining lifetime of a key, e.g. "2d 3h 15m"
pub fn format_time_left(seconds: i64) -> String {
  if seconds <= 0 {
    return "expired".to_string();
  }

  let days = seconds / 86_400;
  let hours = (seconds % 86_400) / 3_600;
  let minutes = (seconds % 3_600) / 60;

  let parts: Vec<String> = [(days, "d"), (hours, "h"), (minutes, "m")]
    .iter()
    .filter(|(n, _)| *n > 0)
    .map(|(n, unit)| format!("{}{}", n, unit))
    .collect();

  if parts.is_empty() {
    "under a minute".to_string()
  } else {
    parts.join(" ")
  }
}

/// Timestamp in the local zone, minute precision
pub fn format_date(at: &DateTime<Utc>) -> String {
  at.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string()
}

pub fn format_optional_date(at: Option<&DateTime<Utc>>) -> String {
  at.map(format_date).unwrap_or_else(|| "never".to_string())
}

/// Where an address sits relative to the server
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IpClass {
  Local,
  Internal,
  External,
}

pub fn classify_ip(ip: &str) -> IpClass {
  if matches!(ip, "127.0.0.1" | "localhost" | "::1") {
    return IpClass::Local;
  }
  if ip.starts_with("192.168.") || ip.starts_with("10.") {
    return IpClass::Internal;
  }
  if let Some(rest) = ip.strip_prefix("172.") {
    let second = rest.split('.').next().and_then(|o| o.parse::<u8>().ok());
    if matches!(second, Some(16..=31)) {
      return IpClass::Internal;
    }
  }
  IpClass::External
}

/// Last-seen address with its class, e.g. "10.0.0.4 (internal)"
pub fn format_ip(ip: Option<&str>) -> String {
  match ip {
    None | Some("") => "unknown".to_string(),
    Some(ip) => match classify_ip(ip) {
      IpClass::Local => format!("{} (local)", ip),
      IpClass::Internal => format!("{} (internal)", ip),
      IpClass::External => ip.to_string(),
    },
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_truncate_short_string() {
    assert_eq!(truncate("hello", 10), "hello");
  }

  #[test]
  fn test_truncate_exact_length() {
    assert_eq!(truncate("hello", 5), "hello");
  }

  #[test]
  fn test_truncate_long_string() {
    assert_eq!(truncate("hello world", 8), "hello...");
  }

  #[test]
  fn test_truncate_multibyte() {
    assert_eq!(truncate("ключ-активации", 7), "ключ...");
  }

  #[test]
  fn test_time_left() {
    assert_eq!(format_time_left(0), "expired");
    assert_eq!(format_time_left(-5), "expired");
    assert_eq!(format_time_left(59), "under a minute");
    assert_eq!(format_time_left(60), "1m");
    assert_eq!(format_time_left(3_600), "1h");
    assert_eq!(format_time_left(86_400 + 120), "1d 2m");
    assert_eq!(format_time_left(2 * 86_400 + 3 * 3_600 + 15 * 60 + 7), "2d 3h 15m");
  }

  #[test]
  fn test_classify_ip() {
    assert_eq!(classify_ip("127.0.0.1"), IpClass::Local);
    assert_eq!(classify_ip("::1"), IpClass::Local);
    assert_eq!(classify_ip("192.168.1.20"), IpClass::Internal);
    assert_eq!(classify_ip("10.1.2.3"), IpClass::Internal);
    assert_eq!(classify_ip("172.16.0.1"), IpClass::Internal);
    assert_eq!(classify_ip("172.31.255.1"), IpClass::Internal);
    assert_eq!(classify_ip("172.32.0.1"), IpClass::External);
    assert_eq!(classify_ip("8.8.8.8"), IpClass::External);
  }

  #[test]
  fn test_format_ip() {
    assert_eq!(format_ip(None), "unknown");
    assert_eq!(format_ip(Some("10.0.0.4")), "10.0.0.4 (internal)");
    assert_eq!(format_ip(Some("localhost")), "localhost (local)");
    assert_eq!(format_ip(Some("1.2.3.4")), "1.2.3.4");
  }

  #[test]
  fn test_key_status_color() {
    assert_eq!(key_status_color(KeyStatus::Active), Color::Green);
    assert_eq!(key_status_color(KeyStatus::Revoked), Color::Red);
  }
}
