//! Rule configuration
//!
//! Every flag defaults to off. Sources apply in order: defaults, a TOML
//! file with one table per rule, `Rule:Flag[=bool]` overrides, then
//! "enable everything".
//!
//! ```toml
//! [IfChainToSwitch]
//! EnableMain = true
//! MaxChainLength = 20
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use thiserror::Error;

/// The three rewrite rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize)]
pub enum Rule {
    IfChainToSwitch,
    StatementSwitchToExpressionSwitch,
    RefactorSwitch,
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("unknown rule '{0}' (expected IfChainToSwitch, StatementSwitchToExpressionSwitch or RefactorSwitch)")]
    UnknownRule(String),
    #[error("unknown flag '{flag}' for rule {rule}")]
    UnknownFlag { rule: Rule, flag: String },
    #[error("invalid value '{value}' for {flag}")]
    InvalidValue { flag: String, value: String },
    #[error("malformed flag '{0}', expected Rule:Flag or Rule:Flag=value")]
    Malformed(String),
    #[error("failed to read config {path}: {source}")]
    Io { path: String, source: std::io::Error },
    #[error("invalid config: {0}")]
    Toml(#[from] toml::de::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase", deny_unknown_fields)]
pub struct IfChainConfig {
    pub enable_main: bool,
    pub enable_safe: bool,
    pub enable_return_switch: bool,
    pub enable_assignment_switch: bool,
    pub max_chain_length: usize,
}

impl Default for IfChainConfig {
    fn default() -> Self {
        IfChainConfig {
            enable_main: false,
            enable_safe: false,
            enable_return_switch: false,
            enable_assignment_switch: false,
            max_chain_length: 50,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase", deny_unknown_fields)]
pub struct StatementSwitchConfig {
    pub enable_direct_conversion: bool,
    pub enable_return_switch_conversion: bool,
    pub enable_assignment_switch_conversion: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase", deny_unknown_fields)]
pub struct RefactorSwitchConfig {
    pub enable_return_switch: bool,
    pub enable_assignment_switch: bool,
    pub enable_simplify_switch: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RefactorConfig {
    #[serde(rename = "IfChainToSwitch")]
    pub if_chain: IfChainConfig,
    #[serde(rename = "StatementSwitchToExpressionSwitch")]
    pub statement_switch: StatementSwitchConfig,
    #[serde(rename = "RefactorSwitch")]
    pub refactor_switch: RefactorSwitchConfig,
}

impl RefactorConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Every boolean flag on; `MaxChainLength` unchanged.
    pub fn all_enabled() -> Self {
        let mut config = RefactorConfig::default();
        config.enable_all();
        config
    }

    pub fn enable_all(&mut self) {
        let max = self.if_chain.max_chain_length;
        self.if_chain = IfChainConfig {
            enable_main: true,
            enable_safe: true,
            enable_return_switch: true,
            enable_assignment_switch: true,
            max_chain_length: max,
        };
        self.statement_switch = StatementSwitchConfig {
            enable_direct_conversion: true,
            enable_return_switch_conversion: true,
            enable_assignment_switch_conversion: true,
        };
        self.refactor_switch = RefactorSwitchConfig {
            enable_return_switch: true,
            enable_assignment_switch: true,
            enable_simplify_switch: true,
        };
    }

    /// Apply one `Rule:Flag` or `Rule:Flag=value` override.
    pub fn apply_flag(&mut self, spec: &str) -> Result<(), ConfigError> {
        let (rule, rest) = spec
            .split_once(':')
            .ok_or_else(|| ConfigError::Malformed(spec.to_string()))?;
        let rule: Rule = rule
            .trim()
            .parse()
            .map_err(|_| ConfigError::UnknownRule(rule.trim().to_string()))?;
        let (flag, value) = match rest.split_once('=') {
            Some((f, v)) => (f.trim(), Some(v.trim())),
            None => (rest.trim(), None),
        };
        if flag.is_empty() {
            return Err(ConfigError::Malformed(spec.to_string()));
        }

        if rule == Rule::IfChainToSwitch && flag == "MaxChainLength" {
            let raw = value.ok_or_else(|| ConfigError::InvalidValue {
                flag: flag.to_string(),
                value: String::new(),
            })?;
            self.if_chain.max_chain_length = raw.parse().map_err(|_| ConfigError::InvalidValue {
                flag: flag.to_string(),
                value: raw.to_string(),
            })?;
            return Ok(());
        }

        let enabled = match value {
            None => true,
            Some(v) => parse_bool(v).ok_or_else(|| ConfigError::InvalidValue {
                flag: flag.to_string(),
                value: v.to_string(),
            })?,
        };
        let slot = self
            .flag_mut(rule, flag)
            .ok_or_else(|| ConfigError::UnknownFlag { rule, flag: flag.to_string() })?;
        *slot = enabled;
        Ok(())
    }

    fn flag_mut(&mut self, rule: Rule, flag: &str) -> Option<&mut bool> {
        match rule {
            Rule::IfChainToSwitch => match flag {
                "EnableMain" => Some(&mut self.if_chain.enable_main),
                "EnableSafe" => Some(&mut self.if_chain.enable_safe),
                "EnableReturnSwitch" => Some(&mut self.if_chain.enable_return_switch),
                "EnableAssignmentSwitch" => Some(&mut self.if_chain.enable_assignment_switch),
                _ => None,
            },
            Rule::StatementSwitchToExpressionSwitch => match flag {
                "EnableDirectConversion" => Some(&mut self.statement_switch.enable_direct_conversion),
                "EnableReturnSwitchConversion" => Some(&mut self.statement_switch.enable_return_switch_conversion),
                "EnableAssignmentSwitchConversion" => {
                    Some(&mut self.statement_switch.enable_assignment_switch_conversion)
                }
                _ => None,
            },
            Rule::RefactorSwitch => match flag {
                "EnableReturnSwitch" => Some(&mut self.refactor_switch.enable_return_switch),
                "EnableAssignmentSwitch" => Some(&mut self.refactor_switch.enable_assignment_switch),
                "EnableSimplifySwitch" => Some(&mut self.refactor_switch.enable_simplify_switch),
                _ => None,
            },
        }
    }

    /// Whether any flag of `rule` can produce a fix.
    pub fn is_enabled(&self, rule: Rule) -> bool {
        match rule {
            Rule::IfChainToSwitch => self.if_chain.enable_main,
            Rule::StatementSwitchToExpressionSwitch => {
                let c = &self.statement_switch;
                c.enable_direct_conversion || c.enable_return_switch_conversion || c.enable_assignment_switch_conversion
            }
            Rule::RefactorSwitch => {
                let c = &self.refactor_switch;
                c.enable_return_switch || c.enable_assignment_switch || c.enable_simplify_switch
            }
        }
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}
