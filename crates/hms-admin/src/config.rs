//! 配置管理
//!
//! 支持默认值、可选配置文件和 `HMS_` 前缀环境变量三层叠加，加载后统一校验

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use hms_core::Vitals;
use hms_triage::{DeskConfig, SimulatorConfig};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, error, info};

/// 配置管理器
#[derive(Debug)]
pub struct ConfigManager {
    /// 配置数据
    config: Arc<RwLock<HmsConfig>>,
    /// 配置文件路径
    config_path: Option<String>,
    /// 配置验证器
    validator: ConfigValidator,
}

/// 系统完整配置
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct HmsConfig {
    /// 服务器配置
    pub server: ServerConfig,
    /// 日志配置
    pub logging: LoggingConfig,
    /// 分诊配置
    pub triage: TriageConfig,
}

/// 服务器配置
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    /// 服务器名称
    pub name: String,
    /// 监听主机
    pub host: String,
    /// 监听端口
    pub port: u16,
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// 日志级别，`RUST_LOG` 优先
    pub level: String,
    /// 以JSON格式输出
    pub json: bool,
    /// 输出target
    pub show_target: bool,
}

/// 分诊配置
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TriageConfig {
    /// 启动时写入三名参考候诊患者；床位目录始终加载
    pub seed_demo_data: bool,
    pub simulator: SimulatorSettings,
    pub siren: SirenSettings,
}

/// 恶化模拟配置
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SimulatorSettings {
    pub enabled: bool,
    /// 触发周期（秒）
    #[serde(with = "duration_secs")]
    pub interval: Duration,
    pub probability: f64,
    pub degraded_oxygen_saturation: u32,
    pub degraded_heart_rate: u32,
}

/// 警报器配置
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SirenSettings {
    /// 重复播报间隔（秒）
    #[serde(with = "duration_secs")]
    pub repeat_interval: Duration,
}

/// 配置验证器
#[derive(Debug)]
pub struct ConfigValidator {
    /// 验证规则
    validation_rules: Vec<ValidationRule>,
}

/// 验证规则
#[derive(Debug)]
struct ValidationRule {
    /// 字段路径
    field_path: &'static str,
    /// 验证函数
    validator: fn(&HmsConfig) -> Result<()>,
}

impl ConfigManager {
    /// 创建新的配置管理器，文件不存在时使用默认值
    pub fn new(config_path: Option<&str>) -> Result<Self> {
        let config = Self::load_config(config_path)?;

        Ok(Self {
            config: Arc::new(RwLock::new(config)),
            config_path: config_path.map(str::to_string),
            validator: ConfigValidator::new(),
        })
    }

    /// 按默认值、配置文件、环境变量的顺序加载
    fn load_config(config_path: Option<&str>) -> Result<HmsConfig> {
        let mut builder = Config::builder().add_source(
            Config::try_from(&HmsConfig::default()).context("Failed to build default configuration")?,
        );

        if let Some(path) = config_path {
            if Path::new(path).exists() {
                builder = builder.add_source(File::with_name(path));
            } else {
                debug!("Configuration file {} not found, using defaults", path);
            }
        }

        let settings = builder
            .add_source(
                Environment::with_prefix("HMS")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to assemble configuration sources")?;

        let config: HmsConfig = settings
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        debug!(
            "Configuration loaded from {}",
            config_path.unwrap_or("defaults")
        );
        Ok(config)
    }

    /// 获取配置
    pub async fn get_config(&self) -> HmsConfig {
        self.config.read().await.clone()
    }

    /// 重新加载并校验配置，校验失败时保留原配置
    pub async fn reload_config(&self) -> Result<()> {
        let new_config = Self::load_config(self.config_path.as_deref())?;
        self.validator.validate(&new_config)?;

        *self.config.write().await = new_config;
        info!("Configuration reloaded");
        Ok(())
    }

    /// 验证配置
    pub async fn validate(&self) -> Result<()> {
        let config = self.config.read().await;
        self.validator.validate(&config)
    }
}

impl ConfigValidator {
    /// 创建新的配置验证器
    pub fn new() -> Self {
        let validation_rules = vec![
            ValidationRule {
                field_path: "server.port",
                validator: |config| {
                    if config.server.port == 0 {
                        Err(anyhow::anyhow!("Server port cannot be 0"))
                    } else {
                        Ok(())
                    }
                },
            },
            ValidationRule {
                field_path: "triage.simulator.probability",
                validator: |config| {
                    let probability = config.triage.simulator.probability;
                    if (0.0..=1.0).contains(&probability) {
                        Ok(())
                    } else {
                        Err(anyhow::anyhow!(
                            "Deterioration probability {} outside [0, 1]",
                            probability
                        ))
                    }
                },
            },
            ValidationRule {
                field_path: "triage.simulator.interval",
                validator: |config| {
                    if config.triage.simulator.interval.is_zero() {
                        Err(anyhow::anyhow!("Simulator interval cannot be 0"))
                    } else {
                        Ok(())
                    }
                },
            },
            ValidationRule {
                field_path: "triage.siren.repeat_interval",
                validator: |config| {
                    if config.triage.siren.repeat_interval.is_zero() {
                        Err(anyhow::anyhow!("Siren repeat interval cannot be 0"))
                    } else {
                        Ok(())
                    }
                },
            },
        ];

        Self { validation_rules }
    }

    /// 验证配置
    pub fn validate(&self, config: &HmsConfig) -> Result<()> {
        for rule in &self.validation_rules {
            if let Err(e) = (rule.validator)(config) {
                error!("Configuration validation failed for {}: {}", rule.field_path, e);
                return Err(e.context(format!("Invalid {}", rule.field_path)));
            }
        }

        debug!("Configuration validation passed");
        Ok(())
    }
}

impl Default for ConfigValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl TriageConfig {
    /// 转换为分诊台配置
    pub fn desk_config(&self) -> DeskConfig {
        DeskConfig {
            simulate_deterioration: self.simulator.enabled,
            simulator: SimulatorConfig {
                interval: self.simulator.interval,
                probability: self.simulator.probability,
                degraded: Vitals {
                    heart_rate: Some(self.simulator.degraded_heart_rate),
                    oxygen_saturation: Some(self.simulator.degraded_oxygen_saturation),
                    ..Default::default()
                },
            },
            siren_repeat_interval: self.siren.repeat_interval,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            name: "HMS ER Triage".to_string(),
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            show_target: true,
        }
    }
}

impl Default for TriageConfig {
    fn default() -> Self {
        Self {
            seed_demo_data: true,
            simulator: SimulatorSettings::default(),
            siren: SirenSettings::default(),
        }
    }
}

impl Default for SimulatorSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            interval: Duration::from_secs(15),
            probability: 0.1,
            degraded_oxygen_saturation: 88,
            degraded_heart_rate: 135,
        }
    }
}

impl Default for SirenSettings {
    fn default() -> Self {
        Self {
            repeat_interval: Duration::from_secs(6),
        }
    }
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}
