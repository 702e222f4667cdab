//! 解析器：统一为 `&Bundle -> Instance` 调用的构建目标
//!
//! 目标是工厂闭包或实现了 [`Construct`] 的类型。解析器的 Identity 即目标的 Identity，
//! 因此 [`Context`](crate::Context) 按配方本身缓存，与包装它的解析器无关。

use crate::bundle::Bundle;
use crate::error::{Error, Result};
use crate::identity::Identity;
use crate::instance::Instance;
use crate::lazy::StandIn;
use serde::{Deserialize, Serialize};
use std::any::{type_name, TypeId};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

type TargetFn = dyn Fn(&Bundle) -> anyhow::Result<Instance> + Send + Sync;

/// 函数目标，克隆共享同一目标和 Identity
#[derive(Clone)]
pub struct Factory {
    call: Arc<TargetFn>,
    type_name: &'static str,
}

impl Factory {
    pub fn new<T, F>(factory: F) -> Self
    where
        F: Fn(&Bundle) -> anyhow::Result<T> + Send + Sync + 'static,
        T: Send + Sync + 'static,
    {
        Self {
            call: Arc::new(move |bundle: &Bundle| -> anyhow::Result<Instance> {
                Ok(Instance::new(factory(bundle)?))
            }),
            type_name: type_name::<T>(),
        }
    }

    pub fn identity(&self) -> Identity {
        Identity::extract(&self.call)
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

impl fmt::Debug for Factory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Factory")
            .field("type_name", &self.type_name)
            .finish()
    }
}

/// 可以从 Bundle 构建自身的类型
pub trait Construct: Sized + Send + Sync + 'static {
    fn construct(bundle: &Bundle) -> anyhow::Result<Self>;
}

/// 构造器目标：类型本身，按 `TypeId` 区分
#[derive(Clone, Copy)]
pub struct Constructor {
    type_id: TypeId,
    type_name: &'static str,
    construct: fn(&Bundle) -> anyhow::Result<Instance>,
}

impl Constructor {
    pub fn of<T: Construct>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            type_name: type_name::<T>(),
            construct: construct_erased::<T>,
        }
    }

    pub fn identity(&self) -> Identity {
        Identity::of_type_id(self.type_id)
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

fn construct_erased<T: Construct>(bundle: &Bundle) -> anyhow::Result<Instance> {
    Ok(Instance::new(T::construct(bundle)?))
}

impl fmt::Debug for Constructor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Constructor")
            .field("type_name", &self.type_name)
            .finish()
    }
}

#[derive(Clone, Debug)]
enum Target {
    Factory(Factory),
    Constructor(Constructor),
}

impl Target {
    fn identity(&self) -> Identity {
        match self {
            Target::Factory(factory) => factory.identity(),
            Target::Constructor(constructor) => constructor.identity(),
        }
    }

    fn type_name(&self) -> &'static str {
        match self {
            Target::Factory(factory) => factory.type_name,
            Target::Constructor(constructor) => constructor.type_name,
        }
    }

    fn invoke(&self, bundle: &Bundle) -> Result<Instance> {
        let outcome = match self {
            Target::Factory(factory) => (factory.call)(bundle),
            Target::Constructor(constructor) => (constructor.construct)(bundle),
        };
        outcome.map_err(|err| Error::from_target(err, self.type_name()))
    }
}

/// 目标的运行时机
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// 立即调用目标
    #[default]
    Eager,
    /// 返回占位实例，首次观察时调用目标
    Lazy,
}

impl FromStr for Strategy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "eager" => Ok(Strategy::Eager),
            "lazy" => Ok(Strategy::Lazy),
            other => Err(Error::InvalidResolution(other.to_string())),
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::Eager => f.write_str("eager"),
            Strategy::Lazy => f.write_str("lazy"),
        }
    }
}

/// [`Resolver::create`] 的选项：恰好一个目标和一个策略
#[derive(Debug, Clone, Default)]
pub struct ResolverOptions {
    factory: Option<Factory>,
    constructor: Option<Constructor>,
    strategy: Strategy,
}

impl ResolverOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn factory(mut self, factory: Factory) -> Self {
        self.factory = Some(factory);
        self
    }

    pub fn constructor(mut self, constructor: Constructor) -> Self {
        self.constructor = Some(constructor);
        self
    }

    pub fn strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn has_target(&self) -> bool {
        self.factory.is_some() || self.constructor.is_some()
    }
}

/// 目标的统一包装
#[derive(Clone)]
pub struct Resolver {
    target: Target,
    strategy: Strategy,
    identity: Identity,
}

impl Resolver {
    pub fn create(options: ResolverOptions) -> Result<Self> {
        let target = match (options.factory, options.constructor) {
            (Some(factory), None) => Target::Factory(factory),
            (None, Some(constructor)) => Target::Constructor(constructor),
            (None, None) => {
                return Err(Error::InvalidOptions(
                    "missing a valid registration target".to_string(),
                ))
            }
            (Some(_), Some(_)) => {
                return Err(Error::InvalidOptions(
                    "a factory and a constructor were both given".to_string(),
                ))
            }
        };

        Ok(Self {
            identity: target.identity(),
            target,
            strategy: options.strategy,
        })
    }

    /// 包装工厂闭包的立即解析器
    pub fn factory<T, F>(factory: F) -> Self
    where
        F: Fn(&Bundle) -> anyhow::Result<T> + Send + Sync + 'static,
        T: Send + Sync + 'static,
    {
        Self::from_target(Target::Factory(Factory::new(factory)), Strategy::Eager)
    }

    /// 包装 [`Construct`] 类型的立即解析器
    pub fn constructor<T: Construct>() -> Self {
        Self::from_target(Target::Constructor(Constructor::of::<T>()), Strategy::Eager)
    }

    fn from_target(target: Target, strategy: Strategy) -> Self {
        Self {
            identity: target.identity(),
            target,
            strategy,
        }
    }

    /// 相同目标换一种策略，Identity 不变
    pub fn with_strategy(&self, strategy: Strategy) -> Self {
        Self {
            strategy,
            ..self.clone()
        }
    }

    /// 立即：现在运行目标。惰性：返回占位实例，首次观察时用 `bundle` 运行目标。
    pub fn resolve(&self, bundle: &Bundle) -> Result<Instance> {
        match self.strategy {
            Strategy::Eager => self.target.invoke(bundle),
            Strategy::Lazy => {
                let target = self.target.clone();
                let bundle = bundle.clone();
                Ok(Instance::stand_in(StandIn::new(
                    self.target.type_name(),
                    Box::new(move || target.invoke(&bundle)),
                )))
            }
        }
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    pub fn target_type(&self) -> &'static str {
        self.target.type_name()
    }
}

impl fmt::Debug for Resolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resolver")
            .field("target", &self.target)
            .field("strategy", &self.strategy)
            .field("identity", &self.identity)
            .finish()
    }
}
