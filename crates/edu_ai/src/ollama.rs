use std::time::Duration;

use edu_core::error::{codes, AppError};

use crate::llm::Availability;

#[derive(Debug, Clone)]
pub struct OllamaClient {
    base_url: String,
}

impl OllamaClient {
    /// Create a client for Ollama. This is strictly limited to `127.0.0.1`.
    pub fn new(base_url: &str) -> Result<Self, AppError> {
        let base_url = base_url.trim_end_matches('/').to_string();

        let not_allowed = || {
            AppError::new(
                codes::BACKEND_NOT_ALLOWED,
                "Ollama base URL must be loopback (http://127.0.0.1[:port])",
            )
            .with_details(format!("base_url={base_url}"))
        };

        if base_url != "http://127.0.0.1" {
            let port = base_url
                .strip_prefix("http://127.0.0.1:")
                .ok_or_else(not_allowed)?;
            // Anything after the host must be a bare, non-zero port.
            match port.parse::<u16>() {
                Ok(p) if p != 0 && port.chars().all(|c| c.is_ascii_digit()) => {}
                _ => return Err(not_allowed()),
            }
        }

        Ok(Self { base_url })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn health_check(&self) -> Availability {
        let url = format!("{}/api/tags", self.base_url);
        let resp = ureq::get(&url).timeout(Duration::from_millis(800)).call();

        match resp {
            Ok(r) if r.status() == 200 => Availability::Available,
            Ok(r) => Availability::Unhealthy { status: r.status() },
            Err(ureq::Error::Status(status, _)) => Availability::Unhealthy { status },
            Err(e) => Availability::Unreachable {
                detail: e.to_string(),
            },
        }
    }
}
