//! [`Container`] 之上的可见性层
//!
//! 模块像容器一样注册配方，但只对外解析公开的 Token。导入的模块的公开 Token
//! 可作为本模块配方的依赖。

use crate::bundle::{Bundle, Descriptor};
use crate::config::WiringConfig;
use crate::container::{Container, ResolutionOptions};
use crate::context::Context;
use crate::error::{Error, Result};
use crate::instance::Instance;
use crate::registration::{Lifecycle, Registration, RegistrationOptions};
use crate::resolver::{Construct, Constructor, Factory, Resolver, ResolverOptions, Strategy};
use crate::token::Token;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Token 是否对模块外部可见
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    #[default]
    Public,
    /// 只对模块自身的配方可见
    Private,
}

impl FromStr for Visibility {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "public" => Ok(Visibility::Public),
            "private" => Ok(Visibility::Private),
            other => Err(Error::InvalidVisibility(other.to_string())),
        }
    }
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Visibility::Public => f.write_str("public"),
            Visibility::Private => f.write_str("private"),
        }
    }
}

/// [`Module::register`] 的选项。未设置的策略依次回退到模块配置和默认值
/// （立即、单例、公开）。
#[derive(Debug, Clone, Default)]
pub struct ModuleRegistrationOptions {
    factory: Option<Factory>,
    constructor: Option<Constructor>,
    strategy: Option<Strategy>,
    lifecycle: Option<Lifecycle>,
    visibility: Option<Visibility>,
    context: Option<Context>,
}

impl ModuleRegistrationOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn factory<T, F>(mut self, factory: F) -> Self
    where
        F: Fn(&Bundle) -> anyhow::Result<T> + Send + Sync + 'static,
        T: Send + Sync + 'static,
    {
        self.factory = Some(Factory::new(factory));
        self
    }

    pub fn constructor<T: Construct>(mut self) -> Self {
        self.constructor = Some(Constructor::of::<T>());
        self
    }

    pub fn strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = Some(strategy);
        self
    }

    pub fn lifecycle(mut self, lifecycle: Lifecycle) -> Self {
        self.lifecycle = Some(lifecycle);
        self
    }

    pub fn visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = Some(visibility);
        self
    }

    /// 单例缓存到 `context` 而非模块的根上下文，模块的副本和导入方也共享该缓存
    pub fn context(mut self, context: Context) -> Self {
        self.context = Some(context);
        self
    }
}

/// [`Module::new`] 的选项
#[derive(Debug, Clone, Default)]
pub struct ModuleOptions {
    pub name: Option<String>,
    /// 单例和导入模块使用的根上下文
    pub context: Option<Context>,
    pub config: Option<Arc<WiringConfig>>,
}

/// 控制 Token 暴露范围的分组单元
pub struct Module {
    name: String,
    context: Context,
    container: Container,
    visibility: IndexMap<Token, Visibility>,
    imports: Vec<Arc<Module>>,
    config: Arc<WiringConfig>,
}

impl Module {
    pub fn new(options: ModuleOptions) -> Self {
        let context = options.context.unwrap_or_default();
        Self {
            name: options.name.unwrap_or_else(|| "anonymous".to_string()),
            container: Container::with_context(context.clone()),
            context,
            visibility: IndexMap::new(),
            imports: Vec::new(),
            config: options.config.unwrap_or_default(),
        }
    }

    pub fn named(name: impl Into<String>) -> Self {
        Self::new(ModuleOptions {
            name: Some(name.into()),
            ..ModuleOptions::default()
        })
    }

    /// 未设置的注册策略取自 `config`
    pub fn with_config(name: impl Into<String>, config: WiringConfig) -> Self {
        Self::new(ModuleOptions {
            name: Some(name.into()),
            config: Some(Arc::new(config)),
            ..ModuleOptions::default()
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// 在 `token` 下注册配方。
    ///
    /// 未提供目标或 Token 已注册时直接失败，不构建任何东西。
    pub fn register(
        &mut self,
        token: impl Into<Token>,
        options: ModuleRegistrationOptions,
    ) -> Result<()> {
        let token = token.into();
        let policy = self.config.policy_for(token.as_str())?;

        let ModuleRegistrationOptions {
            factory,
            constructor,
            strategy,
            lifecycle,
            visibility,
            context,
        } = options;

        let mut resolver_options = ResolverOptions::new().strategy(strategy.unwrap_or(policy.strategy));
        if let Some(factory) = factory {
            resolver_options = resolver_options.factory(factory);
        }
        if let Some(constructor) = constructor {
            resolver_options = resolver_options.constructor(constructor);
        }
        if !resolver_options.has_target() {
            return Err(Error::InvalidOptions(format!(
                "token \"{token}\" has no factory or constructor"
            )));
        }

        if self.container.has(token.as_str()) {
            return Err(Error::DuplicateToken {
                module: self.name.clone(),
                token,
            });
        }

        let pinned = context.is_some();
        let resolver = Resolver::create(resolver_options)?;
        let registration = Registration::create(
            resolver,
            RegistrationOptions {
                context,
                lifecycle: Some(lifecycle.unwrap_or(policy.lifecycle)),
            },
        );
        let visibility = visibility.unwrap_or(policy.visibility);

        tracing::debug!(
            module = %self.name,
            token = %token,
            visibility = %visibility,
            "Module registration added"
        );
        if pinned {
            self.container.register_pinned(token.clone(), &registration);
        } else {
            self.container.register(token.clone(), &registration);
        }
        self.visibility.insert(token, visibility);
        Ok(())
    }

    pub fn register_factory<T, F>(&mut self, token: impl Into<Token>, factory: F) -> Result<()>
    where
        F: Fn(&Bundle) -> anyhow::Result<T> + Send + Sync + 'static,
        T: Send + Sync + 'static,
    {
        self.register(token, ModuleRegistrationOptions::new().factory(factory))
    }

    pub fn register_constructor<T: Construct>(&mut self, token: impl Into<Token>) -> Result<()> {
        self.register(token, ModuleRegistrationOptions::new().constructor::<T>())
    }

    /// 导入 `module` 的副本，其单例缓存在本模块的根上下文中，与原模块互不影响
    pub fn import(&mut self, module: &Module) {
        tracing::debug!(module = %self.name, imported = %module.name, "Module imported");
        self.imports
            .push(Arc::new(module.clone_with(Some(self.context.clone()))));
    }

    /// `token` 是否在本模块注册且公开
    pub fn exposes(&self, token: &str) -> bool {
        self.visibility.get(token) == Some(&Visibility::Public)
    }

    pub fn has(&self, token: &str) -> bool {
        self.container.has(token)
    }

    /// 按注册顺序列出公开 Token
    pub fn exposed_tokens(&self) -> Vec<Token> {
        self.visibility
            .iter()
            .filter(|(_, visibility)| **visibility == Visibility::Public)
            .map(|(token, _)| token.clone())
            .collect()
    }

    pub fn imports(&self) -> impl Iterator<Item = &Module> {
        self.imports.iter().map(|module| module.as_ref())
    }

    /// 解析公开 Token。
    ///
    /// 自身注册优先于导入，调用方的 Bundle 只补充两者都未提供的 Token。
    pub fn resolve(&self, token: &str, options: ResolutionOptions) -> Result<Instance> {
        if !self.container.has(token) {
            return Err(Error::UnknownToken(Token::from(token)));
        }
        if !self.exposes(token) {
            return Err(Error::NotExposed(Token::from(token)));
        }

        let context = options.context.unwrap_or_default();
        let imported = self.imported_bundle(&context);
        let bundle = Bundle::merge([Some(&imported), options.bundle.as_ref()]);

        self.container
            .resolve(
                token,
                ResolutionOptions {
                    context: Some(context),
                    bundle: Some(bundle),
                },
            )?
            .ok_or_else(|| Error::UnknownToken(Token::from(token)))
    }

    pub fn get<T: Send + Sync + 'static>(&self, token: &str) -> Result<Arc<T>> {
        self.resolve(token, ResolutionOptions::default())?
            .resolve::<T>(&Token::from(token))
    }

    /// 复制模块及其注册和导入，绑定到 `context` 或新的根上下文
    pub fn clone_with(&self, context: Option<Context>) -> Module {
        let context = context.unwrap_or_default();
        Module {
            name: self.name.clone(),
            container: self.container.clone_with(Some(context.clone())),
            imports: self
                .imports
                .iter()
                .map(|module| Arc::new(module.clone_with(Some(context.clone()))))
                .collect(),
            visibility: self.visibility.clone(),
            config: self.config.clone(),
            context,
        }
    }

    /// 所有导入模块公开 Token 的访问器，先导入者优先
    fn imported_bundle(&self, context: &Context) -> Bundle {
        let entries = self.imports.iter().flat_map(|module| {
            module.exposed_tokens().into_iter().map(move |token| {
                let module = Arc::clone(module);
                let context = context.clone();
                let name = token.clone();
                let descriptor = Descriptor::accessor(move || {
                    module.resolve(name.as_str(), ResolutionOptions::in_context(&context))
                });
                (token, descriptor)
            })
        });

        Bundle::create(entries)
    }
}

impl fmt::Debug for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Module")
            .field("name", &self.name)
            .field("visibility", &self.visibility)
            .field("imports", &self.imports.len())
            .finish()
    }
}
