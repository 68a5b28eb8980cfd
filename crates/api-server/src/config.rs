//! Runtime configuration read from the environment

use std::path::PathBuf;

use tracing::{info, warn};

const DEFAULT_JWT_SECRET: &str = "dev-jwt-secret-change-me";

#[derive(Debug, Clone)]
pub struct Config {
    pub data_dir: PathBuf,
    pub in_memory: bool,
    pub jwt_secret: String,
    pub public_base_url: String,
    pub rest_port: u16,
    pub socket_port: u16,
}

impl Config {
    pub fn from_env() -> Self {
        let jwt_secret = env_string("TAREFAS_JWT_SECRET", DEFAULT_JWT_SECRET);
        if jwt_secret == DEFAULT_JWT_SECRET {
            warn!("TAREFAS_JWT_SECRET not set, using the development secret");
        }

        Self {
            data_dir: PathBuf::from(env_string("TAREFAS_DATA_DIR", ".tarefas-data")),
            in_memory: env_flag("TAREFAS_IN_MEMORY", false),
            jwt_secret,
            public_base_url: env_string("TAREFAS_PUBLIC_BASE_URL", "http://localhost:8081"),
            rest_port: env_port("TAREFAS_REST_PORT", 8081),
            socket_port: env_port("TAREFAS_SOCKET_PORT", 8080),
        }
    }
}

fn env_string(name: &str, default: &str) -> String {
    std::env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn env_port(name: &str, default: u16) -> u16 {
    match std::env::var(name) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|e| {
            warn!("Invalid {} value {:?}: {}, using {}", name, raw, e, default);
            default
        }),
        Err(_) => {
            info!("{} not set, using default: {}", name, default);
            default
        }
    }
}

fn parse_flag(raw: &str, default: bool) -> bool {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => true,
        "0" | "false" | "no" | "off" => false,
        _ => default,
    }
}

fn env_flag(name: &str, default: bool) -> bool {
    match std::env::var(name) {
        Ok(raw) => parse_flag(&raw, default),
        Err(_) => default,
    }
}
