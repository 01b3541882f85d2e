//! # 配置装载
//!
//! 三层叠加：内置默认值 ← 可选配置文件 `config/souba.toml` ←
//! `SOUBA_*` 环境变量（如 `SOUBA_SERVER__PORT=9090`）。

use souba_core::config::AppConfig;

/// # Summary
/// 装载应用配置。
///
/// # Returns
/// 叠加完成的 `AppConfig`；配置文件/环境变量格式非法时返回错误。
pub fn load() -> Result<AppConfig, config::ConfigError> {
    let settings = config::Config::builder()
        .add_source(config::Config::try_from(&AppConfig::default())?)
        .add_source(config::File::with_name("config/souba").required(false))
        .add_source(config::Environment::with_prefix("SOUBA").separator("__"))
        .build()?;

    settings.try_deserialize()
}
