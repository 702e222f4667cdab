use crate::bundle::Bundle;
use crate::context::Context;
use crate::error::{Error, Result};
use crate::instance::Instance;
use crate::resolver::Resolver;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 实例生命周期
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Lifecycle {
    /// 每次解析新建
    Transient,
    /// 每个注册上下文一个实例
    #[default]
    Singleton,
    /// 每个调用方上下文一个实例
    Scoped,
}

impl FromStr for Lifecycle {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "transient" => Ok(Lifecycle::Transient),
            "singleton" => Ok(Lifecycle::Singleton),
            "scoped" => Ok(Lifecycle::Scoped),
            other => Err(Error::InvalidLifecycle(other.to_string())),
        }
    }
}

impl fmt::Display for Lifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Lifecycle::Transient => f.write_str("transient"),
            Lifecycle::Singleton => f.write_str("singleton"),
            Lifecycle::Scoped => f.write_str("scoped"),
        }
    }
}

/// [`Registration::create`] 的选项
#[derive(Debug, Clone, Default)]
pub struct RegistrationOptions {
    /// 单例缓存，缺省时使用私有上下文
    pub context: Option<Context>,
    pub lifecycle: Option<Lifecycle>,
}

impl RegistrationOptions {
    pub fn lifecycle(lifecycle: Lifecycle) -> Self {
        Self {
            lifecycle: Some(lifecycle),
            ..Self::default()
        }
    }
}

/// [`Registration::resolve`] 的选项
#[derive(Debug, Clone, Default)]
pub struct ResolveOptions {
    pub bundle: Option<Bundle>,
    /// 作用域注册必需
    pub context: Option<Context>,
    /// 仅本次调用覆盖生命周期
    pub lifecycle: Option<Lifecycle>,
}

/// 绑定生命周期和默认上下文的解析器
#[derive(Clone)]
pub struct Registration {
    resolver: Resolver,
    context: Context,
    lifecycle: Lifecycle,
}

impl Registration {
    pub fn create(resolver: Resolver, options: RegistrationOptions) -> Self {
        Self {
            resolver,
            context: options.context.unwrap_or_default(),
            lifecycle: options.lifecycle.unwrap_or_default(),
        }
    }

    pub fn singleton(resolver: Resolver) -> Self {
        Self::create(resolver, RegistrationOptions::lifecycle(Lifecycle::Singleton))
    }

    pub fn transient(resolver: Resolver) -> Self {
        Self::create(resolver, RegistrationOptions::lifecycle(Lifecycle::Transient))
    }

    pub fn scoped(resolver: Resolver) -> Self {
        Self::create(resolver, RegistrationOptions::lifecycle(Lifecycle::Scoped))
    }

    /// 解析器和生命周期不变，给定 `context` 时替换默认上下文
    pub fn clone_with(&self, context: Option<Context>) -> Self {
        Self {
            resolver: self.resolver.clone(),
            context: context.unwrap_or_else(|| self.context.clone()),
            lifecycle: self.lifecycle,
        }
    }

    pub fn resolve(&self, options: ResolveOptions) -> Result<Instance> {
        let lifecycle = options.lifecycle.unwrap_or(self.lifecycle);
        let bundle = options.bundle.unwrap_or_default();

        tracing::trace!(
            identity = %self.resolver.identity(),
            target_type = self.resolver.target_type(),
            lifecycle = %lifecycle,
            "Resolving registration"
        );

        match lifecycle {
            Lifecycle::Transient => self.resolver.resolve(&bundle),
            Lifecycle::Singleton => self.context.resolve(&self.resolver, &bundle),
            Lifecycle::Scoped => options
                .context
                .ok_or(Error::MissingContext)?
                .resolve(&self.resolver, &bundle),
        }
    }

    pub fn resolver(&self) -> &Resolver {
        &self.resolver
    }

    pub fn context(&self) -> &Context {
        &self.context
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("resolver", &self.resolver)
            .field("lifecycle", &self.lifecycle)
            .finish()
    }
}
