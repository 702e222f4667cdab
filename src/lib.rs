//! 以 Token 为键的依赖解析。
//!
//! 配方注册在 [`Token`] 下，构建时从 [`Bundle`] 读取彼此的值。[`Container`] 按
//! [`Lifecycle`] 解析：瞬态、单例（按容器缓存）或作用域（按调用方提供的 [`Context`]
//! 缓存）。惰性配方返回占位实例，相互依赖的配方因此可以在使用前完成构建。
//!
//! ```
//! use wiring::{Bundle, Container, Registration, Resolver};
//!
//! let container = Container::new();
//! container.register("a", &Registration::singleton(Resolver::factory(|_: &Bundle| Ok(2))));
//! container.register("b", &Registration::singleton(Resolver::factory(|_: &Bundle| Ok(3))));
//! container.register(
//!     "c",
//!     &Registration::singleton(Resolver::factory(|bundle: &Bundle| {
//!         Ok(*bundle.resolve::<i32>("a")? + *bundle.resolve::<i32>("b")?)
//!     })),
//! );
//!
//! assert_eq!(*container.get::<i32>("c").unwrap().unwrap(), 5);
//! ```

pub mod bundle;
pub mod config;
pub mod container;
pub mod context;
pub mod error;
pub mod identity;
pub mod instance;
pub mod lazy;
pub mod logging;
pub mod module;
mod once;
pub mod registration;
pub mod resolver;
pub mod token;

pub use bundle::{Bundle, BundleEntry, Descriptor};
pub use config::{Policy, WiringConfig};
pub use container::{Container, ResolutionOptions};
pub use context::Context;
pub use error::{ConfigError, Error, IdentityError, Result};
pub use identity::Identity;
pub use instance::Instance;
pub use lazy::{Lazy, StandIn};
pub use module::{Module, ModuleOptions, ModuleRegistrationOptions, Visibility};
pub use registration::{Lifecycle, Registration, RegistrationOptions, ResolveOptions};
pub use resolver::{Construct, Constructor, Factory, Resolver, ResolverOptions, Strategy};
pub use token::Token;
