//! 模块可见性与导入测试

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use wiring::{
    Bundle, Construct, Context, Descriptor, Error, Lifecycle, Module, ModuleOptions,
    ModuleRegistrationOptions, ResolutionOptions, Strategy, Visibility,
};

#[derive(Debug)]
struct Repository {
    url: String,
}

impl Construct for Repository {
    fn construct(bundle: &Bundle) -> anyhow::Result<Self> {
        Ok(Repository {
            url: bundle.resolve::<String>("database_url")?.to_string(),
        })
    }
}

fn database_module() -> Module {
    let mut module = Module::named("database");
    module
        .register(
            "database_url",
            ModuleRegistrationOptions::new()
                .factory(|_: &Bundle| Ok("postgres://localhost".to_string()))
                .visibility(Visibility::Private),
        )
        .unwrap();
    module.register_constructor::<Repository>("repository").unwrap();
    module
}

#[test]
fn test_duplicate_registration_fails() {
    let mut module = Module::named("core");
    module.register_factory("a", |_: &Bundle| Ok(1_u8)).unwrap();

    let err = module.register_factory("a", |_: &Bundle| Ok(2_u8)).unwrap_err();

    assert!(matches!(
        err,
        Error::DuplicateToken { ref module, ref token } if module == "core" && token.as_str() == "a"
    ));
    assert_eq!(*module.get::<u8>("a").unwrap(), 1);
}

#[test]
fn test_registration_without_target_fails() {
    let mut module = Module::named("core");
    let err = module
        .register("a", ModuleRegistrationOptions::new())
        .unwrap_err();
    assert!(matches!(err, Error::InvalidOptions(_)));
}

#[test]
fn test_unknown_token_fails() {
    let module = Module::named("core");
    let err = module.resolve("missing", ResolutionOptions::default()).unwrap_err();
    assert!(matches!(err, Error::UnknownToken(ref token) if token.as_str() == "missing"));
}

#[test]
fn test_private_token_is_not_exposed() {
    let module = database_module();
    let err = module
        .resolve("database_url", ResolutionOptions::default())
        .unwrap_err();
    assert!(matches!(err, Error::NotExposed(_)));
}

#[test]
fn test_public_token_reads_private_dependency() {
    let module = database_module();
    let repository = module.get::<Repository>("repository").unwrap();
    assert_eq!(repository.url, "postgres://localhost");
}

#[test]
fn test_imported_public_tokens_feed_own_recipes() {
    let mut app = Module::named("app");
    app.import(&database_module());
    app.register_factory("service", |bundle: &Bundle| {
        Ok(format!("service over {}", bundle.resolve::<Repository>("repository")?.url))
    })
    .unwrap();

    let service = app.get::<String>("service").unwrap();

    assert_eq!(*service, "service over postgres://localhost");
    assert_eq!(app.imports().count(), 1);
}

#[test]
fn test_imported_private_tokens_stay_hidden() {
    let mut app = Module::named("app");
    app.import(&database_module());
    app.register_factory("leak", |bundle: &Bundle| {
        Ok(bundle.resolve::<String>("database_url")?.len())
    })
    .unwrap();

    let err = app.get::<usize>("leak").unwrap_err();
    assert!(matches!(err, Error::MissingToken(ref token) if token.as_str() == "database_url"));
}

#[test]
fn test_imported_tokens_are_not_reexported() {
    let mut app = Module::named("app");
    app.import(&database_module());

    let err = app.resolve("repository", ResolutionOptions::default()).unwrap_err();
    assert!(matches!(err, Error::UnknownToken(_)));
}

#[test]
fn test_own_registration_shadows_import() {
    let mut app = Module::named("app");
    app.import(&database_module());
    app.register_factory("repository", |_: &Bundle| {
        Ok(Repository {
            url: "sqlite://memory".to_string(),
        })
    })
    .unwrap();
    app.register_factory("url", |bundle: &Bundle| {
        Ok(bundle.resolve::<Repository>("repository")?.url.clone())
    })
    .unwrap();

    assert_eq!(*app.get::<String>("url").unwrap(), "sqlite://memory");
}

#[test]
fn test_imported_singletons_are_cached_by_importer() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let mut shared = Module::named("shared");
    shared
        .register_factory("clock", move |_: &Bundle| {
            Ok(counter.fetch_add(1, Ordering::SeqCst))
        })
        .unwrap();

    let mut app = Module::named("app");
    app.import(&shared);
    app.register(
        "reader",
        ModuleRegistrationOptions::new()
            .factory(|bundle: &Bundle| Ok(*bundle.resolve::<usize>("clock")?))
            .lifecycle(Lifecycle::Transient),
    )
    .unwrap();

    app.get::<usize>("reader").unwrap();
    app.get::<usize>("reader").unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    shared.get::<usize>("clock").unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[test]
fn test_caller_bundle_fills_unprovided_tokens() {
    let mut module = Module::named("greeter");
    module
        .register_factory("greeting", |bundle: &Bundle| {
            Ok(format!("hello {}", bundle.resolve::<String>("name")?))
        })
        .unwrap();

    let bundle = Bundle::create([("name", Descriptor::value("world".to_string()))]);
    let greeting = module
        .resolve("greeting", ResolutionOptions::with_bundle(bundle))
        .unwrap();

    assert_eq!(
        *greeting.resolve::<String>(&"greeting".into()).unwrap(),
        "hello world"
    );
}

#[test]
fn test_scoped_registration_follows_caller_context() {
    let mut module = Module::new(ModuleOptions {
        name: Some("requests".to_string()),
        ..ModuleOptions::default()
    });
    module
        .register(
            "request_id",
            ModuleRegistrationOptions::new()
                .factory(|_: &Bundle| Ok(wiring::Identity::create()))
                .lifecycle(Lifecycle::Scoped),
        )
        .unwrap();

    let scope = Context::new();
    let first = module
        .resolve("request_id", ResolutionOptions::in_context(&scope))
        .unwrap();
    let second = module
        .resolve("request_id", ResolutionOptions::in_context(&scope))
        .unwrap();
    let other = module
        .resolve("request_id", ResolutionOptions::in_context(&Context::new()))
        .unwrap();

    assert!(first.ptr_eq(&second));
    assert!(!first.ptr_eq(&other));
}

#[test]
fn test_lazy_registration_through_module() {
    let mut module = Module::named("lazy");
    module
        .register(
            "value",
            ModuleRegistrationOptions::new()
                .factory(|_: &Bundle| Ok(7_u64))
                .strategy(Strategy::Lazy),
        )
        .unwrap();

    let instance = module.resolve("value", ResolutionOptions::default()).unwrap();
    assert!(instance.is_stand_in());
    assert_eq!(*module.get::<u64>("value").unwrap(), 7);
}

#[test]
fn test_clone_copies_registrations_and_imports() {
    let mut app = Module::named("app");
    app.import(&database_module());
    app.register_factory("service", |bundle: &Bundle| {
        Ok(bundle.resolve::<Repository>("repository")?.url.len())
    })
    .unwrap();

    let cloned = app.clone_with(None);

    assert_eq!(cloned.name(), "app");
    assert_eq!(cloned.imports().count(), 1);
    assert_eq!(
        *cloned.get::<usize>("service").unwrap(),
        "postgres://localhost".len()
    );
}

#[test]
fn test_explicit_context_caches_singleton_outside_module() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let shared = Context::new();
    let mut module = Module::named("pinned");
    module
        .register(
            "x",
            ModuleRegistrationOptions::new()
                .factory(move |_: &Bundle| Ok(counter.fetch_add(1, Ordering::SeqCst) as u8))
                .context(shared.clone()),
        )
        .unwrap();

    let first = module.get::<u8>("x").unwrap();
    assert_eq!(shared.len(), 1);

    let mut importer = Module::named("importer");
    importer.import(&module);
    importer
        .register_factory("y", |bundle: &Bundle| Ok(*bundle.resolve::<u8>("x")?))
        .unwrap();

    assert_eq!(*importer.get::<u8>("y").unwrap(), *first);
    assert!(Arc::ptr_eq(&first, &module.clone_with(None).get::<u8>("x").unwrap()));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}
