//! 错误类型

use crate::identity::Identity;
use crate::token::Token;
use thiserror::Error;

/// 全局 Result 别名
pub type Result<T> = std::result::Result<T, Error>;

/// 解析错误
#[derive(Debug, Error)]
pub enum Error {
    /// Identity 生成或解码失败
    #[error("Identity error: {0}")]
    Identity(#[from] IdentityError),

    /// 配置文件错误
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// 未提供目标，或同时提供了两种目标
    #[error("Could not create resolver. Invalid registration options: {0}")]
    InvalidOptions(String),

    /// 解析策略无效
    #[error("Invalid resolution strategy: {0}")]
    InvalidResolution(String),

    /// 生命周期无效
    #[error("Could not resolve registration. Invalid lifecycle: {0}")]
    InvalidLifecycle(String),

    /// 可见性无效
    #[error("Invalid visibility: {0}")]
    InvalidVisibility(String),

    /// 作用域注册缺少上下文
    #[error("Could not resolve scoped registration. Missing resolution context")]
    MissingContext,

    /// 同一模块内重复注册
    #[error("Could not register token \"{token}\". Module \"{module}\" already contains a registration assigned to the same token")]
    DuplicateToken { module: String, token: Token },

    /// 模块中没有该 Token
    #[error("Could not resolve token \"{0}\". Module does not contain a registration associated to the given token")]
    UnknownToken(Token),

    /// Token 已注册但为私有
    #[error("Could not resolve token \"{0}\". Module does not expose a registration associated to the given token")]
    NotExposed(Token),

    /// Bundle 中缺少该 Token
    #[error("Bundle does not provide token \"{0}\"")]
    MissingToken(Token),

    /// 实例类型不匹配
    #[error("Type cast failed for \"{token}\": expected '{expected}', found '{actual}'")]
    TypeCastFailed {
        token: Token,
        expected: &'static str,
        actual: &'static str,
    },

    /// 占位实例在构建期间被自身观察
    #[error("Circular materialization of '{0}'")]
    CircularMaterialization(&'static str),

    /// 构建线程再次请求同一目标
    #[error("Circular resolution of identity {0}")]
    CircularResolution(Identity),

    /// 目标自身失败
    #[error("Failed to construct '{target}': {source}")]
    Construction {
        target: &'static str,
        #[source]
        source: anyhow::Error,
    },
}

impl Error {
    /// 目标透传的解析错误原样取出，其他错误包装为 `Construction`
    pub(crate) fn from_target(err: anyhow::Error, target: &'static str) -> Self {
        match err.downcast::<Error>() {
            Ok(err) => err,
            Err(source) => Error::Construction { target, source },
        }
    }
}

/// Identity 错误详情
#[derive(Debug, Error, PartialEq, Eq)]
pub enum IdentityError {
    #[error("Invalid base62 character '{0}'")]
    InvalidCharacter(char),
    #[error("Invalid identity length {0}, expected 22")]
    InvalidLength(usize),
    #[error("Identity value exceeds 128 bits")]
    Overflow,
    #[error("Invalid UUID: {0}")]
    InvalidUuid(String),
}

/// 配置错误详情
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read file '{0}': {1}")]
    FileRead(String, #[source] std::io::Error),
    #[error("Failed to parse TOML: {0}")]
    TomlParse(#[source] toml::de::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_target_keeps_resolution_errors() {
        let err = Error::from_target(anyhow::Error::new(Error::MissingContext), "Foo");
        assert!(matches!(err, Error::MissingContext));
    }

    #[test]
    fn test_from_target_wraps_foreign_errors() {
        let err = Error::from_target(anyhow::anyhow!("boom"), "Foo");
        match err {
            Error::Construction { target, source } => {
                assert_eq!(target, "Foo");
                assert_eq!(source.to_string(), "boom");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_display_names_the_token() {
        let err = Error::DuplicateToken {
            module: "core".to_string(),
            token: Token::from("db"),
        };
        let message = err.to_string();
        assert!(message.contains("\"db\""));
        assert!(message.contains("\"core\""));
    }
}
