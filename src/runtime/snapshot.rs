//! Read-only view of a session handed to the presentation layer.

use crate::core::params::SessionParams;
use crate::runtime::generation::RequestState;

#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    pub display_text: String,
    pub target_text: String,
    pub running: bool,
    pub cycle_count: u64,
    pub last_latency_ms: Option<u64>,
    /// Total tokens reported by the last completed call.
    pub last_tokens: Option<u64>,
    pub last_error: Option<String>,
    /// Model echoed by the last completed call.
    pub last_model: Option<String>,
    pub request_state: RequestState,
    pub parameters: SessionParams,
}

impl SessionSnapshot {
    pub fn in_flight(&self) -> bool {
        matches!(self.request_state, RequestState::InFlight { .. })
    }

    /// One-line summary, e.g. `cycle #4 · llama-3.1-8b-instant · 640ms · 212 tok`.
    pub fn status_line(&self) -> String {
        let model = self
            .last_model
            .as_deref()
            .unwrap_or(self.parameters.model.as_str());
        let latency = self
            .last_latency_ms
            .map(latency_label)
            .unwrap_or_else(|| "-".to_string());
        let tokens = self
            .last_tokens
            .map(|tokens| format!("{tokens} tok"))
            .unwrap_or_else(|| "-".to_string());

        let mut line = format!("cycle #{} · {model} · {latency} · {tokens}", self.cycle_count);
        if let Some(error) = &self.last_error {
            line.push_str(" · error: ");
            line.push_str(error);
        }
        line
    }
}

/// Formats a latency as `640ms` below one second and `1.3s` above.
pub fn latency_label(ms: u64) -> String {
    if ms < 1_000 {
        return format!("{ms}ms");
    }
    let seconds = (ms as f64 / 100.0).round() / 10.0;
    format!("{seconds}s")
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn snapshot() -> SessionSnapshot {
        SessionSnapshot {
            display_text: "a b".to_string(),
            target_text: "a b".to_string(),
            running: true,
            cycle_count: 4,
            last_latency_ms: Some(640),
            last_tokens: Some(212),
            last_error: None,
            last_model: None,
            request_state: RequestState::Completed,
            parameters: SessionParams::default(),
        }
    }

    #[test]
    fn latency_label_switches_to_seconds() {
        assert_eq!(latency_label(0), "0ms");
        assert_eq!(latency_label(999), "999ms");
        assert_eq!(latency_label(1_000), "1s");
        assert_eq!(latency_label(1_260), "1.3s");
        assert_eq!(latency_label(12_340), "12.3s");
    }

    #[test]
    fn status_line_prefers_echoed_model() {
        let mut snapshot = snapshot();
        assert_eq!(
            snapshot.status_line(),
            "cycle #4 · llama-3.1-8b-instant · 640ms · 212 tok"
        );

        snapshot.last_model = Some("qwen/qwen3-32b".to_string());
        snapshot.last_tokens = None;
        snapshot.last_error = Some("Missing GROQ_API_KEY".to_string());
        assert_eq!(
            snapshot.status_line(),
            "cycle #4 · qwen/qwen3-32b · 640ms · - · error: Missing GROQ_API_KEY"
        );
    }
}
