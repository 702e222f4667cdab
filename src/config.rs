//! 从 TOML 加载的注册策略
//!
//! ```toml
//! [defaults]
//! lifecycle = "singleton"
//! resolution = "eager"
//!
//! [registrations.session]
//! lifecycle = "scoped"
//! visibility = "private"
//! ```

use crate::error::{ConfigError, Result};
use crate::module::Visibility;
use crate::registration::Lifecycle;
use crate::resolver::Strategy;
use crate::token::Token;
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// 文件中的原始策略字符串，加载时即解析
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PolicyConfig {
    pub lifecycle: Option<String>,
    pub resolution: Option<String>,
    pub visibility: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WiringConfig {
    #[serde(default)]
    pub defaults: PolicyConfig,
    #[serde(default)]
    pub registrations: HashMap<Token, PolicyConfig>,
}

/// 单个 Token 的生效策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Policy {
    pub lifecycle: Lifecycle,
    pub strategy: Strategy,
    pub visibility: Visibility,
}

impl WiringConfig {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: WiringConfig = toml::from_str(content).map_err(ConfigError::TomlParse)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .map_err(|e| ConfigError::FileRead(path.display().to_string(), e))?;
        let config = Self::from_toml_str(&content)?;
        tracing::debug!(
            path = %path.display(),
            registrations = config.registrations.len(),
            "Wiring configuration loaded"
        );
        Ok(config)
    }

    /// 优先级：Token 配置 > `[defaults]` > 内置默认值
    pub fn policy_for(&self, token: &str) -> Result<Policy> {
        let base = apply(Policy::default(), &self.defaults)?;
        match self.registrations.get(token) {
            Some(overrides) => apply(base, overrides),
            None => Ok(base),
        }
    }

    fn validate(&self) -> Result<()> {
        self.policy_for("")?;
        for token in self.registrations.keys() {
            self.policy_for(token.as_str())?;
        }
        Ok(())
    }
}

fn apply(mut policy: Policy, config: &PolicyConfig) -> Result<Policy> {
    if let Some(lifecycle) = &config.lifecycle {
        policy.lifecycle = lifecycle.parse()?;
    }
    if let Some(resolution) = &config.resolution {
        policy.strategy = resolution.parse()?;
    }
    if let Some(visibility) = &config.visibility {
        policy.visibility = visibility.parse()?;
    }
    Ok(policy)
}
