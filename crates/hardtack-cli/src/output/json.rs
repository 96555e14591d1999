//! JSON output formatter

use serde::Serialize;

pub fn format_value<T: Serialize + ?Sized>(value: &T) -> String {
    match serde_json::to_string_pretty(value) {
        Ok(json) => json + "\n",
        Err(e) => {
            tracing::warn!("Failed to serialize output: {}", e);
            "{}\n".to_string()
        }
    }
}
