//! Environment-driven server configuration, resolved once at startup.

use std::net::SocketAddr;

fn env_nonempty(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_u16(key: &str, default: u16) -> u16 {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse::<u16>().ok())
        .unwrap_or(default)
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bind: String,
    pub port: u16,
    /// Missing credential makes the chat endpoint fail closed (500).
    pub openai_api_key: Option<String>,
    pub openai_model: String,
    pub supabase_url: Option<String>,
    pub supabase_service_role_key: Option<String>,
    /// Optional JSON file with the full mountain table; used instead of
    /// Supabase when set (local development, demos).
    pub dataset_file: Option<String>,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            bind: env_nonempty("MEIZAN_BIND").unwrap_or_else(|| "127.0.0.1".to_string()),
            port: env_u16("MEIZAN_PORT", 8091),
            openai_api_key: env_nonempty("OPENAI_API_KEY"),
            openai_model: env_nonempty("OPENAI_MODEL").unwrap_or_else(|| "gpt-4o-mini".to_string()),
            supabase_url: env_nonempty("SUPABASE_URL"),
            supabase_service_role_key: env_nonempty("SUPABASE_SERVICE_ROLE_KEY"),
            dataset_file: env_nonempty("MEIZAN_DATASET_FILE"),
        }
    }

    pub fn addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.bind, self.port).parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn addr_joins_bind_and_port() {
        let cfg = Config {
            bind: "0.0.0.0".into(),
            port: 9000,
            openai_api_key: None,
            openai_model: "gpt-4o-mini".into(),
            supabase_url: None,
            supabase_service_role_key: None,
            dataset_file: None,
        };
        assert_eq!(cfg.addr().unwrap().port(), 9000);
    }
}
