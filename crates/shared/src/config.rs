use std::env;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for {name}: {value}")]
    InvalidValue { name: &'static str, value: String },
}

/// ToDo の保存先
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    DynamoDb,
    Memory,
}

impl FromStr for StoreKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "dynamodb" => Ok(Self::DynamoDb),
            "memory" => Ok(Self::Memory),
            _ => Err(()),
        }
    }
}

/// ログの出力形式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
}

impl FromStr for LogFormat {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "pretty" => Ok(Self::Pretty),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub app_name: String,
    pub bind_address: IpAddr,
    pub port: u16,
    pub store: StoreKind,
    pub dynamodb_table: String,
    /// DynamoDB Local などのエンドポイント上書き
    pub dynamodb_endpoint: Option<String>,
    pub request_timeout: Duration,
    /// 設定されている場合のみ OTLP でスパンを送信する
    pub otlp_endpoint: Option<String>,
    pub log_format: LogFormat,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// 任意の参照関数から設定を組み立てる（テストでは環境変数を汚さないためこちらを使う）
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // 空文字は未設定と同じ扱い
        let var = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        Ok(Config {
            app_name: var("APP_NAME").unwrap_or_else(|| "todo-service".to_string()),
            bind_address: parse_var(&var, "BIND_ADDRESS", IpAddr::from([0, 0, 0, 0]))?,
            port: parse_var(&var, "PORT", 3000)?,
            store: parse_var(&var, "TODO_STORE", StoreKind::DynamoDb)?,
            dynamodb_table: var("DYNAMODB_TABLE").unwrap_or_else(|| "todo-service".to_string()),
            dynamodb_endpoint: var("DYNAMODB_ENDPOINT"),
            request_timeout: Duration::from_secs(parse_var(&var, "REQUEST_TIMEOUT_SECS", 10)?),
            otlp_endpoint: var("OTEL_EXPORTER_OTLP_ENDPOINT"),
            log_format: parse_var(&var, "LOG_FORMAT", LogFormat::Json)?,
        })
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_address, self.port)
    }
}

fn parse_var<T, F>(var: &F, name: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match var(name) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
            name,
            value: raw,
        }),
    }
}
