//! Token 注册表
//!
//! 每次解析都会构建兄弟 Bundle：每个已注册 Token 对应一个访问器，读取时才解析。
//! 配方之间按 Token 互相引用，与声明顺序无关，只有实际读取的依赖会被解析。

use crate::bundle::{Bundle, Descriptor};
use crate::context::Context;
use crate::error::{Error, Result};
use crate::instance::Instance;
use crate::registration::{Registration, ResolveOptions};
use crate::token::Token;
use indexmap::IndexMap;
use parking_lot::RwLock;
use std::fmt;
use std::sync::{Arc, Weak};

type Registry = RwLock<IndexMap<Token, Binding>>;

#[derive(Clone)]
struct Binding {
    registration: Registration,
    /// 保留注册自带的上下文，克隆时也不重新绑定
    pinned: bool,
}

/// [`Container::resolve`] 的选项
#[derive(Debug, Clone, Default)]
pub struct ResolutionOptions {
    /// 作用域注册使用的上下文，缺省时每次调用新建
    pub context: Option<Context>,
    /// 为容器未提供的 Token 补充值
    pub bundle: Option<Bundle>,
}

impl ResolutionOptions {
    pub fn in_context(context: &Context) -> Self {
        Self {
            context: Some(context.clone()),
            bundle: None,
        }
    }

    pub fn with_bundle(bundle: Bundle) -> Self {
        Self {
            context: None,
            bundle: Some(bundle),
        }
    }
}

/// Token → registration registry with its own root context.
pub struct Container {
    root: Context,
    registry: Arc<Registry>,
}

impl Container {
    pub fn new() -> Self {
        Self::with_context(Context::new())
    }

    /// 单例缓存在 `root` 中的容器
    pub fn with_context(root: Context) -> Self {
        Self {
            root,
            registry: Arc::new(RwLock::new(IndexMap::new())),
        }
    }

    /// 保存绑定到本容器根上下文的 `registration` 副本，覆盖该 Token 之前的注册
    pub fn register(&self, token: impl Into<Token>, registration: &Registration) {
        self.bind(
            token.into(),
            Binding {
                registration: registration.clone_with(Some(self.root.clone())),
                pinned: false,
            },
        );
    }

    /// 按原样保存 `registration`：单例缓存在它自己的上下文中，
    /// [`Container::clone_with`] 得到的副本也共享该上下文。
    pub fn register_pinned(&self, token: impl Into<Token>, registration: &Registration) {
        self.bind(
            token.into(),
            Binding {
                registration: registration.clone(),
                pinned: true,
            },
        );
    }

    fn bind(&self, token: Token, binding: Binding) {
        tracing::debug!(
            token = %token,
            lifecycle = %binding.registration.lifecycle(),
            target_type = binding.registration.resolver().target_type(),
            pinned = binding.pinned,
            "Registering token"
        );
        self.registry.write().insert(token, binding);
    }

    /// 解析 `token`，未注册时返回 `None`。
    ///
    /// 已注册的兄弟优先于 `options.bundle`，后者只补充容器未提供的 Token。
    pub fn resolve(&self, token: &str, options: ResolutionOptions) -> Result<Option<Instance>> {
        let context = options.context.unwrap_or_default();
        resolve_in(&self.registry, token, context, options.bundle)
    }

    /// 使用默认选项的类型化解析，延迟值会被构建
    pub fn get<T: Send + Sync + 'static>(&self, token: &str) -> Result<Option<Arc<T>>> {
        self.get_with(token, ResolutionOptions::default())
    }

    pub fn get_with<T: Send + Sync + 'static>(
        &self,
        token: &str,
        options: ResolutionOptions,
    ) -> Result<Option<Arc<T>>> {
        self.resolve(token, options)?
            .map(|instance| instance.resolve::<T>(&Token::from(token)))
            .transpose()
    }

    /// 复制所有注册到新容器，绑定到 `context` 或新的根上下文。
    /// 固定注册保留原上下文。
    pub fn clone_with(&self, context: Option<Context>) -> Container {
        let container = Container::with_context(context.unwrap_or_default());
        for (token, binding) in self.registry.read().iter() {
            if binding.pinned {
                container.register_pinned(token.clone(), &binding.registration);
            } else {
                container.register(token.clone(), &binding.registration);
            }
        }
        container
    }

    pub fn has(&self, token: &str) -> bool {
        self.registry.read().contains_key(token)
    }

    pub fn registration(&self, token: &str) -> Option<Registration> {
        self.registry
            .read()
            .get(token)
            .map(|binding| binding.registration.clone())
    }

    /// 按注册顺序列出 Token
    pub fn tokens(&self) -> Vec<Token> {
        self.registry.read().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.registry.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.registry.read().is_empty()
    }

    pub fn root_context(&self) -> &Context {
        &self.root
    }
}

impl Default for Container {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Container")
            .field("tokens", &self.tokens())
            .field("root", &self.root)
            .finish()
    }
}

fn resolve_in(
    registry: &Arc<Registry>,
    token: &str,
    context: Context,
    external: Option<Bundle>,
) -> Result<Option<Instance>> {
    let (registration, tokens) = {
        let registrations = registry.read();
        let Some(registration) = registrations
            .get(token)
            .map(|binding| binding.registration.clone())
        else {
            tracing::debug!(token, "Token is not registered");
            return Ok(None);
        };
        (registration, registrations.keys().cloned().collect::<Vec<_>>())
    };

    let siblings = sibling_bundle(registry, tokens, &context, external.as_ref());
    let bundle = Bundle::merge([Some(&siblings), external.as_ref()]);

    registration
        .resolve(ResolveOptions {
            bundle: Some(bundle),
            context: Some(context),
            lifecycle: None,
        })
        .map(Some)
}

/// 每个已注册 Token 一个访问器，读取前不解析任何东西。
/// 访问器只持有注册表的弱引用，缓存的占位实例不会让注册表存活。
fn sibling_bundle(
    registry: &Arc<Registry>,
    tokens: Vec<Token>,
    context: &Context,
    external: Option<&Bundle>,
) -> Bundle {
    let entries = tokens.into_iter().map(|token| {
        let registry: Weak<Registry> = Arc::downgrade(registry);
        let context = context.clone();
        let external = external.cloned();
        let sibling = token.clone();
        let descriptor = Descriptor::accessor(move || {
            let registry = registry
                .upgrade()
                .ok_or_else(|| Error::MissingToken(sibling.clone()))?;
            resolve_in(&registry, sibling.as_str(), context.clone(), external.clone())?
                .ok_or_else(|| Error::MissingToken(sibling.clone()))
        });
        (token, descriptor)
    });

    Bundle::create(entries)
}
