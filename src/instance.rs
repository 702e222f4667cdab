use crate::error::{Error, Result};
use crate::lazy::StandIn;
use crate::token::Token;
use std::any::{type_name, Any};
use std::fmt;
use std::sync::Arc;

/// 类型擦除后的解析结果。
///
/// 惰性注册返回包装 [`StandIn`] 的实例，类型化访问时自动构建。
#[derive(Clone)]
pub struct Instance {
    type_name: &'static str,
    value: Arc<dyn Any + Send + Sync>,
}

impl Instance {
    pub fn new<T: Send + Sync + 'static>(value: T) -> Self {
        Self::from_arc(Arc::new(value))
    }

    pub fn from_arc<T: Send + Sync + 'static>(value: Arc<T>) -> Self {
        Self {
            type_name: type_name::<T>(),
            value,
        }
    }

    pub(crate) fn stand_in(stand_in: StandIn) -> Self {
        Self {
            type_name: stand_in.target_type(),
            value: Arc::new(stand_in),
        }
    }

    /// 具体类型名，占位实例则为目标类型名
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn as_stand_in(&self) -> Option<&StandIn> {
        self.value.downcast_ref::<StandIn>()
    }

    pub fn is_stand_in(&self) -> bool {
        self.as_stand_in().is_some()
    }

    /// 两个句柄是否指向同一个值
    pub fn ptr_eq(&self, other: &Instance) -> bool {
        Arc::ptr_eq(&self.value, &other.value)
    }

    /// 构建占位实例并返回具体实例
    pub fn materialize(&self) -> Result<Instance> {
        let mut current = self.clone();
        while let Some(stand_in) = current.as_stand_in() {
            let next = stand_in.materialize()?;
            current = next;
        }
        Ok(current)
    }

    /// 类型化观察：先构建，再向下转型
    pub fn resolve<T: Send + Sync + 'static>(&self, token: &Token) -> Result<Arc<T>> {
        let concrete = self.materialize()?;
        let actual = concrete.type_name;
        concrete
            .value
            .downcast::<T>()
            .map_err(|_| Error::TypeCastFailed {
                token: token.clone(),
                expected: type_name::<T>(),
                actual,
            })
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instance")
            .field("type_name", &self.type_name)
            .field("stand_in", &self.is_stand_in())
            .finish()
    }
}
