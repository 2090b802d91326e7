//! 信封行为配置。
//!
//! # 契约说明（What）
//! - 全部字段均有缺省值，可从 TOML 片段按需覆盖：
//!
//! ```toml
//! default_prefix = "type.example.com"
//!
//! [text]
//! max_depth = 32
//! prefer_verbose = false
//! ```
//!
//! - [`AnyConfig::validate`] 拒绝空前缀与零深度；[`AnyConfig::from_toml_str`] 在解析后自动校验。

use serde::Deserialize;

use crate::error::{AnyError, Result};
use crate::text::DEFAULT_MAX_DEPTH;
use crate::type_url::DEFAULT_PREFIX;

/// 顶层配置。
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnyConfig {
    /// 打包时使用的类型 URL 前缀。
    pub default_prefix: String,
    /// 文本格式相关配置。
    pub text: TextConfig,
}

/// 文本格式配置。
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TextConfig {
    /// 嵌套消息字面量的最大深度。
    pub max_depth: usize,
    /// 输出时若负载可物化，优先使用 `[type_url] { ... }` 详细形式。
    pub prefer_verbose: bool,
}

impl Default for AnyConfig {
    fn default() -> Self {
        Self {
            default_prefix: DEFAULT_PREFIX.to_owned(),
            text: TextConfig::default(),
        }
    }
}

impl Default for TextConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            prefer_verbose: true,
        }
    }
}

impl AnyConfig {
    /// 解析并校验 TOML 配置。
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let config: AnyConfig = toml::from_str(source).map_err(|err| AnyError::Config {
            detail: err.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// 校验字段取值。
    pub fn validate(&self) -> Result<()> {
        if self.default_prefix.trim().is_empty() {
            return Err(AnyError::Config {
                detail: "default_prefix must not be empty".to_owned(),
            });
        }
        if self.text.max_depth == 0 {
            return Err(AnyError::Config {
                detail: "text.max_depth must be at least 1".to_owned(),
            });
        }
        Ok(())
    }
}
