//! 延迟构建
//!
//! 惰性解析器不调用目标，而是返回 [`StandIn`]。首次观察时运行目标，之后的观察都得到
//! 同一个值。[`Lazy<T>`] 是配方在自身构建期间不能触碰的依赖的类型化句柄。

use crate::error::{Error, Result};
use crate::instance::Instance;
use crate::once::OnceSlot;
use crate::token::Token;
use parking_lot::Mutex;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

type Thunk = Box<dyn Fn() -> Result<Instance> + Send + Sync>;

/// 惰性解析器返回的占位实例
pub struct StandIn {
    target_type: &'static str,
    /// 构建成功后释放
    thunk: Mutex<Option<Arc<dyn Fn() -> Result<Instance> + Send + Sync>>>,
    slot: OnceSlot,
}

impl StandIn {
    pub(crate) fn new(target_type: &'static str, thunk: Thunk) -> Self {
        Self {
            target_type,
            thunk: Mutex::new(Some(Arc::from(thunk))),
            slot: OnceSlot::new(),
        }
    }

    pub fn target_type(&self) -> &'static str {
        self.target_type
    }

    pub fn is_materialized(&self) -> bool {
        self.slot.is_ready()
    }

    /// 首次调用时运行目标，之后返回缓存值。
    ///
    /// 目标运行期间不持有锁。其他线程等待构建完成；构建线程自身再次观察则返回
    /// [`Error::CircularMaterialization`]。构建失败时占位实例保持待构建状态。
    pub fn materialize(&self) -> Result<Instance> {
        self.slot.get_or_try_init(
            || {
                let Some(thunk) = self.thunk.lock().clone() else {
                    return Err(Error::CircularMaterialization(self.target_type));
                };
                tracing::trace!(target_type = self.target_type, "Materializing stand-in");
                let instance = thunk()?;
                *self.thunk.lock() = None;
                Ok(instance)
            },
            || Error::CircularMaterialization(self.target_type),
        )
    }
}

impl fmt::Debug for StandIn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StandIn")
            .field("target_type", &self.target_type)
            .field("materialized", &self.is_materialized())
            .finish()
    }
}

/// 可能尚未构建的依赖的类型化句柄
pub struct Lazy<T> {
    token: Token,
    instance: Instance,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Send + Sync + 'static> Lazy<T> {
    pub fn new(token: Token, instance: Instance) -> Self {
        Self {
            token,
            instance,
            _marker: PhantomData,
        }
    }

    /// 首次使用时构建并向下转型
    pub fn get(&self) -> Result<Arc<T>> {
        self.instance.resolve::<T>(&self.token)
    }

    pub fn is_materialized(&self) -> bool {
        self.instance
            .as_stand_in()
            .map_or(true, StandIn::is_materialized)
    }

    pub fn token(&self) -> &Token {
        &self.token
    }

    pub fn instance(&self) -> &Instance {
        &self.instance
    }
}

impl<T> Clone for Lazy<T> {
    fn clone(&self) -> Self {
        Self {
            token: self.token.clone(),
            instance: self.instance.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T> fmt::Debug for Lazy<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lazy")
            .field("token", &self.token)
            .field("instance", &self.instance)
            .finish()
    }
}
