//! Runtime settings: built-in defaults, then an optional TOML file, then
//! `ARBX__`-prefixed environment variables (`ARBX__SERVER__PORT=8080`).

use std::path::Path;
use std::time::Duration;

use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};

use crate::engine::arbitrage::DEFAULT_MIN_PROFIT_PCT;
use crate::error::SettingsError;

pub const DEFAULT_CONFIG_FILE: &str = "arbx.toml";
const ENV_PREFIX: &str = "ARBX";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub server: ServerSettings,
    pub poll: PollSettings,
    pub arbitrage: ArbitrageSettings,
    pub log: LogSettings,
    pub exchanges: Vec<ExchangeConfig>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerSettings::default(),
            poll: PollSettings::default(),
            arbitrage: ArbitrageSettings::default(),
            log: LogSettings::default(),
            exchanges: default_exchanges(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    /// Prometheus scrape port; only used with the `metrics-exporter` feature.
    pub metrics_port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self { host: "0.0.0.0".into(), port: 5000, metrics_port: 9000 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PollSettings {
    pub interval_secs: u64,
    /// Per-exchange request budget.
    pub timeout_ms: u64,
    pub user_agent: String,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval_secs: 30,
            timeout_ms: 10_000,
            user_agent: concat!("arbx/", env!("CARGO_PKG_VERSION")).into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArbitrageSettings {
    pub min_profit_pct: f64,
}

impl Default for ArbitrageSettings {
    fn default() -> Self {
        Self { min_profit_pct: DEFAULT_MIN_PROFIT_PCT }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    pub filter: String,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self { filter: "info,tower_http=warn".into() }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExchangeKind {
    Binance,
    Coinbase,
    Kraken,
    Kucoin,
    Huobi,
    Bybit,
    Mexc,
}

impl ExchangeKind {
    pub const ALL: [ExchangeKind; 7] = [
        ExchangeKind::Binance,
        ExchangeKind::Coinbase,
        ExchangeKind::Kraken,
        ExchangeKind::Kucoin,
        ExchangeKind::Huobi,
        ExchangeKind::Bybit,
        ExchangeKind::Mexc,
    ];

    pub fn display_name(self) -> &'static str {
        match self {
            ExchangeKind::Binance => "Binance",
            ExchangeKind::Coinbase => "Coinbase",
            ExchangeKind::Kraken => "Kraken",
            ExchangeKind::Kucoin => "KuCoin",
            ExchangeKind::Huobi => "Huobi",
            ExchangeKind::Bybit => "Bybit",
            ExchangeKind::Mexc => "MEXC",
        }
    }

    pub fn ticker_url(self) -> &'static str {
        match self {
            ExchangeKind::Binance => "https://api.binance.com/api/v3/ticker/price",
            ExchangeKind::Coinbase => "https://api.pro.coinbase.com/products/tickers",
            ExchangeKind::Kraken => "https://api.kraken.com/0/public/Ticker",
            ExchangeKind::Kucoin => "https://api.kucoin.com/api/v1/market/allTickers",
            ExchangeKind::Huobi => "https://api.huobi.pro/market/tickers",
            ExchangeKind::Bybit => "https://api.bybit.com/v5/market/tickers?category=spot",
            ExchangeKind::Mexc => "https://api.mexc.com/api/v3/ticker/price",
        }
    }

    fn website(self) -> &'static str {
        match self {
            ExchangeKind::Binance => "https://www.binance.com",
            ExchangeKind::Coinbase => "https://www.coinbase.com",
            ExchangeKind::Kraken => "https://www.kraken.com",
            ExchangeKind::Kucoin => "https://www.kucoin.com",
            ExchangeKind::Huobi => "https://www.huobi.com",
            ExchangeKind::Bybit => "https://www.bybit.com",
            ExchangeKind::Mexc => "https://www.mexc.com",
        }
    }

    fn description(self) -> &'static str {
        match self {
            ExchangeKind::Binance => "World's largest cryptocurrency exchange by trading volume",
            ExchangeKind::Coinbase => "Leading cryptocurrency exchange with institutional-grade security",
            ExchangeKind::Kraken => "One of the oldest and most trusted cryptocurrency exchanges",
            ExchangeKind::Kucoin => "Global cryptocurrency exchange with extensive altcoin support",
            ExchangeKind::Huobi => "Leading digital asset exchange with global presence",
            ExchangeKind::Bybit => "A global cryptocurrency exchange with a wide range of assets",
            ExchangeKind::Mexc => "A popular exchange known for its extensive list of altcoins",
        }
    }
}

/// Static per-exchange metadata plus the endpoint to poll.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExchangeConfig {
    pub kind: ExchangeKind,
    pub name: String,
    pub url: String,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub logo: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl ExchangeConfig {
    pub fn defaults_for(kind: ExchangeKind) -> Self {
        Self {
            kind,
            name: kind.display_name().into(),
            url: kind.ticker_url().into(),
            enabled: true,
            website: Some(kind.website().into()),
            logo: None,
            description: Some(kind.description().into()),
        }
    }
}

fn enabled_by_default() -> bool {
    true
}

fn default_exchanges() -> Vec<ExchangeConfig> {
    ExchangeKind::ALL.into_iter().map(ExchangeConfig::defaults_for).collect()
}

impl Settings {
    /// Load from `path` (required if given) or `arbx.toml` (optional), then env.
    /// Not validated: callers apply their own overrides first, then call `validate`.
    pub fn load(path: Option<&Path>) -> Result<Self, SettingsError> {
        let file = match path {
            Some(p) => File::from(p).required(true),
            None => File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };
        let settings: Settings = Config::builder()
            .add_source(file)
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;
        Ok(settings)
    }

    pub fn from_toml(contents: &str) -> Result<Self, SettingsError> {
        let settings: Settings = Config::builder()
            .add_source(File::from_str(contents, FileFormat::Toml))
            .build()?
            .try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.poll.interval_secs == 0 {
            return Err(SettingsError::Invalid("poll.interval_secs must be > 0".into()));
        }
        if self.poll.timeout_ms == 0 {
            return Err(SettingsError::Invalid("poll.timeout_ms must be > 0".into()));
        }
        let pct = self.arbitrage.min_profit_pct;
        if !pct.is_finite() || pct < 0.0 {
            return Err(SettingsError::Invalid(format!("arbitrage.min_profit_pct must be a non-negative number, got {pct}")));
        }
        if self.enabled_exchanges().next().is_none() {
            return Err(SettingsError::Invalid("at least one exchange must be enabled".into()));
        }
        let mut names: Vec<&str> = self.enabled_exchanges().map(|e| e.name.as_str()).collect();
        names.sort_unstable();
        if let Some(dup) = names.windows(2).find(|w| w[0] == w[1]) {
            return Err(SettingsError::Invalid(format!("duplicate exchange name {:?}", dup[0])));
        }
        Ok(())
    }

    pub fn enabled_exchanges(&self) -> impl Iterator<Item = &ExchangeConfig> {
        self.exchanges.iter().filter(|e| e.enabled)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll.interval_secs)
    }

    pub fn adapter_timeout(&self) -> Duration {
        Duration::from_millis(self.poll.timeout_ms)
    }
}
