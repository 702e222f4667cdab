//! 不可变的按需求值映射
//!
//! Bundle 把依赖传入配方。条目只安装一次，同一 Token 以先出现者为准，之后不可修改。
//! 访问器条目每次读取都会重新运行，Bundle 不缓存其结果。

use crate::error::{Error, Result};
use crate::instance::Instance;
use crate::lazy::Lazy;
use crate::token::Token;
use indexmap::IndexMap;
use std::fmt;
use std::sync::Arc;

type Accessor = Arc<dyn Fn() -> Result<Instance> + Send + Sync>;

#[derive(Clone)]
enum Slot {
    Value(Instance),
    Accessor(Accessor),
}

/// 条目取值方式
#[derive(Clone)]
pub struct Descriptor {
    slot: Slot,
    hidden: bool,
}

impl Descriptor {
    pub fn value<T: Send + Sync + 'static>(value: T) -> Self {
        Self::instance(Instance::new(value))
    }

    pub fn instance(instance: Instance) -> Self {
        Self {
            slot: Slot::Value(instance),
            hidden: false,
        }
    }

    /// 每次读取时计算
    pub fn accessor<F>(accessor: F) -> Self
    where
        F: Fn() -> Result<Instance> + Send + Sync + 'static,
    {
        Self {
            slot: Slot::Accessor(Arc::new(accessor)),
            hidden: false,
        }
    }

    /// 可读取，但不出现在 [`Bundle::keys`] 中
    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    pub fn is_hidden(&self) -> bool {
        self.hidden
    }

    pub fn is_accessor(&self) -> bool {
        matches!(self.slot, Slot::Accessor(_))
    }

    fn read(&self) -> Result<Instance> {
        match &self.slot {
            Slot::Value(instance) => Ok(instance.clone()),
            Slot::Accessor(accessor) => accessor(),
        }
    }
}

impl fmt::Debug for Descriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match &self.slot {
            Slot::Value(instance) => instance.type_name(),
            Slot::Accessor(_) => "<accessor>",
        };
        f.debug_struct("Descriptor")
            .field("slot", &kind)
            .field("hidden", &self.hidden)
            .finish()
    }
}

type Producer = Box<dyn FnOnce(&Bundle) -> Descriptor + Send>;

/// [`Bundle::create`] 的输入
pub enum BundleEntry {
    Descriptor(Descriptor),
    /// 构建期间调用一次，参数为已安装的条目
    Producer(Producer),
}

impl BundleEntry {
    pub fn producer<F>(produce: F) -> Self
    where
        F: FnOnce(&Bundle) -> Descriptor + Send + 'static,
    {
        BundleEntry::Producer(Box::new(produce))
    }
}

impl From<Descriptor> for BundleEntry {
    fn from(descriptor: Descriptor) -> Self {
        BundleEntry::Descriptor(descriptor)
    }
}

/// Token 到值的不可变映射
#[derive(Clone, Default)]
pub struct Bundle {
    entries: Arc<IndexMap<Token, Descriptor>>,
}

impl Bundle {
    pub fn empty() -> Self {
        Self::default()
    }

    /// 按顺序折叠 `entries` 构建 Bundle。
    ///
    /// 同一 Token 以第一个条目为准，之后的条目（包括生产者）直接丢弃，不会求值。
    pub fn create<I, K, E>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, E)>,
        K: Into<Token>,
        E: Into<BundleEntry>,
    {
        let mut installed: Arc<IndexMap<Token, Descriptor>> = Arc::default();

        for (token, entry) in entries {
            let token = token.into();
            if installed.contains_key(&token) {
                tracing::trace!(token = %token, "Duplicate bundle entry dropped");
                continue;
            }

            let descriptor = match entry.into() {
                BundleEntry::Descriptor(descriptor) => descriptor,
                BundleEntry::Producer(produce) => {
                    // 生产者与构建过程共享同一份映射；只有它保留了部分 bundle 时才会复制
                    let partial = Bundle {
                        entries: Arc::clone(&installed),
                    };
                    produce(&partial)
                }
            };

            Arc::make_mut(&mut installed).insert(token, descriptor);
        }

        Self { entries: installed }
    }

    /// 合并多个 Bundle，跳过缺失的。冲突时靠前者优先，访问器原样保留不求值。
    pub fn merge<'a, I>(bundles: I) -> Self
    where
        I: IntoIterator<Item = Option<&'a Bundle>>,
    {
        let present: Vec<&Bundle> = bundles.into_iter().flatten().collect();

        if let [single] = present.as_slice() {
            return (*single).clone();
        }

        Self::create(present.into_iter().flat_map(|bundle| {
            bundle
                .entries
                .iter()
                .map(|(token, descriptor)| (token.clone(), descriptor.clone()))
        }))
    }

    /// 读取条目，访问器条目会被运行
    pub fn get(&self, token: &str) -> Result<Instance> {
        self.entries
            .get(token)
            .ok_or_else(|| Error::MissingToken(Token::from(token)))?
            .read()
    }

    /// 类型化读取，延迟值会被构建
    pub fn resolve<T: Send + Sync + 'static>(&self, token: &str) -> Result<Arc<T>> {
        self.get(token)?.resolve::<T>(&Token::from(token))
    }

    /// 类型化句柄，延迟值直到使用时才构建
    pub fn lazy<T: Send + Sync + 'static>(&self, token: &str) -> Result<Lazy<T>> {
        let instance = self.get(token)?;
        Ok(Lazy::new(Token::from(token), instance))
    }

    pub fn contains(&self, token: &str) -> bool {
        self.entries.contains_key(token)
    }

    /// 按安装顺序列出可见 Token
    pub fn keys(&self) -> impl Iterator<Item = &Token> {
        self.entries
            .iter()
            .filter(|(_, descriptor)| !descriptor.hidden)
            .map(|(token, _)| token)
    }

    /// 条目数量，含隐藏条目
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for Bundle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.entries.iter()).finish()
    }
}
