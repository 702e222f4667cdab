//! 解析上下文：按 Identity 记忆化的实例缓存

use crate::bundle::Bundle;
use crate::error::{Error, Result};
use crate::identity::Identity;
use crate::instance::Instance;
use crate::once::OnceSlot;
use crate::resolver::Resolver;
use dashmap::DashMap;
use std::fmt;
use std::sync::Arc;

/// 按 Identity 缓存实例，每个 Identity 只构建一次。
///
/// 首次成功的调用决定缓存值，之后的调用忽略自己的参数。克隆共享同一份缓存。
#[derive(Clone, Default)]
pub struct Context {
    instances: Arc<DashMap<Identity, Arc<OnceSlot>>>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    /// 返回解析器 Identity 对应的缓存实例，未命中时用 `bundle` 解析
    pub fn resolve(&self, resolver: &Resolver, bundle: &Bundle) -> Result<Instance> {
        self.memoize(resolver.identity().clone(), || resolver.resolve(bundle))
    }

    /// `identity` 未缓存时运行 `compute`。
    ///
    /// 构建期间不持有缓存锁，目标可以经由同一上下文解析其他依赖。其他线程请求同一
    /// Identity 时等待构建完成；同一线程在构建中再次请求则返回
    /// [`Error::CircularResolution`]。失败的结果不会被缓存。
    pub fn memoize<F>(&self, identity: Identity, compute: F) -> Result<Instance>
    where
        F: FnOnce() -> Result<Instance>,
    {
        if let Some(cached) = self.instances.get(&identity).and_then(|slot| slot.get()) {
            tracing::trace!(identity = %identity, "Context cache hit");
            return Ok(cached);
        }

        // 先取出槽位再释放分片锁
        let slot = self
            .instances
            .entry(identity.clone())
            .or_insert_with(|| Arc::new(OnceSlot::new()))
            .clone();

        slot.get_or_try_init(
            || {
                tracing::trace!(identity = %identity, "Context cache miss");
                compute()
            },
            || Error::CircularResolution(identity.clone()),
        )
    }

    pub fn contains(&self, identity: &Identity) -> bool {
        self.instances
            .get(identity)
            .map_or(false, |slot| slot.is_ready())
    }

    /// 已缓存的实例数，不含构建中或失败的条目
    pub fn len(&self) -> usize {
        self.instances
            .iter()
            .filter(|entry| entry.value().is_ready())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.instances.clear();
    }

    /// 两个句柄是否共享同一份缓存
    pub fn ptr_eq(&self, other: &Context) -> bool {
        Arc::ptr_eq(&self.instances, &other.instances)
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("cached", &self.len())
            .finish()
    }
}
