//! Parameter resolution for handler calls.
//!
//! An [`Invoker`] binds a handler's declared parameters, in declaration
//! order, against the variables collected while walking a route tree:
//!
//! 1. the reserved names `route` and `module`;
//! 2. a variable of the same name;
//! 3. the parameter's declared default;
//! 4. the invoker's own [`Invoker::lookup`] step;
//! 5. otherwise [`InvocationError::MissingParameter`].
//!
//! [`DirectInvoker`] stops after step 3. [`RegistryInvoker`] resolves
//! step 4 against a [`Container`] keyed by the parameter's declared type.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::error::InvocationError;
use crate::handler::{Arg, Args, Handler, Param, MODULE, ROUTE};
use crate::route::Vars;

/// Binds handler parameters to values.
pub trait Invoker {
    /// Supplies a parameter that no variable or default satisfied.
    fn lookup(&self, param: &Param) -> Option<Arg> {
        let _ = param;
        None
    }

    /// Binds every parameter of `handler` against `vars`.
    fn bind(&self, handler: &Handler, vars: &Vars) -> Result<Args, InvocationError> {
        let mut args = Args::with_capacity(handler.params().len());

        for param in handler.params() {
            let name = param.name();

            let arg = match name {
                ROUTE => Arg::Route,
                MODULE => Arg::Module,
                _ => vars
                    .get(name)
                    .or_else(|| param.default_value())
                    .cloned()
                    .map(Arg::Value)
                    .or_else(|| self.lookup(param))
                    .ok_or_else(|| InvocationError::MissingParameter {
                        name: name.to_string(),
                        origin: handler.origin(),
                    })?,
            };

            args.push(name, arg);
        }

        Ok(args)
    }
}

/// Resolves parameters from variables and defaults only.
#[derive(Debug, Clone, Copy, Default)]
pub struct DirectInvoker;

impl Invoker for DirectInvoker {}

/// A registry of services keyed by type.
pub trait Container {
    /// Returns `true` if a service is registered under `key`.
    fn has(&self, key: &str) -> bool;

    /// Returns the service registered under `key`.
    fn get(&self, key: &str) -> Option<Rc<dyn Any>>;
}

/// A simple [`Container`] holding one shared instance per type.
#[derive(Clone, Default)]
pub struct ServiceRegistry {
    services: HashMap<String, Rc<dyn Any>>,
}

impl ServiceRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `service` under its type name.
    #[must_use]
    pub fn with<T: 'static>(mut self, service: T) -> Self {
        self.insert(service);
        self
    }

    /// Registers `service` under its type name, replacing any previous one.
    pub fn insert<T: 'static>(&mut self, service: T) {
        self.insert_keyed(std::any::type_name::<T>(), Rc::new(service));
    }

    /// Registers a service under an explicit key.
    pub fn insert_keyed(&mut self, key: impl Into<String>, service: Rc<dyn Any>) {
        self.services.insert(key.into(), service);
    }

    /// Returns the number of registered services.
    pub fn len(&self) -> usize {
        self.services.len()
    }

    /// Returns `true` if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }
}

impl Container for ServiceRegistry {
    fn has(&self, key: &str) -> bool {
        self.services.contains_key(key)
    }

    fn get(&self, key: &str) -> Option<Rc<dyn Any>> {
        self.services.get(key).cloned()
    }
}

impl fmt::Debug for ServiceRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.services.keys()).finish()
    }
}

/// Resolves parameters like [`DirectInvoker`], then by declared type
/// against a [`Container`].
#[derive(Clone)]
pub struct RegistryInvoker {
    container: Rc<dyn Container>,
}

impl RegistryInvoker {
    /// Creates an invoker backed by `container`.
    pub fn new(container: impl Container + 'static) -> Self {
        Self {
            container: Rc::new(container),
        }
    }

    /// Creates an invoker sharing an existing container.
    pub fn shared(container: Rc<dyn Container>) -> Self {
        Self { container }
    }
}

impl Invoker for RegistryInvoker {
    fn lookup(&self, param: &Param) -> Option<Arg> {
        let key = param.declared_type()?;

        if !self.container.has(key) {
            return None;
        }

        self.container.get(key).map(Arg::Service)
    }
}

impl fmt::Debug for RegistryInvoker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistryInvoker").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Origin;
    use serde_json::json;

    struct Database {
        name: &'static str,
    }

    fn vars() -> Vars {
        let mut vars = Vars::new();
        vars.insert("post_id", json!("42"));
        vars
    }

    fn names(args: &Args) -> Vec<&str> {
        args.names().collect()
    }

    #[test]
    fn test_binds_in_declaration_order() {
        let handler = Handler::new(|_, _| ())
            .param("post_id")
            .param("module")
            .param("route");

        let args = DirectInvoker.bind(&handler, &vars()).unwrap();
        assert_eq!(names(&args), ["post_id", "module", "route"]);
        assert_eq!(args.str("post_id"), Some("42"));
        assert!(matches!(args.get("module"), Some(Arg::Module)));
    }

    #[test]
    fn test_named_value_beats_default() {
        let handler = Handler::new(|_, _| ()).param(Param::new("post_id").default("1"));
        let args = DirectInvoker.bind(&handler, &vars()).unwrap();
        assert_eq!(args.str("post_id"), Some("42"));
    }

    #[test]
    fn test_default_fills_gap() {
        let handler = Handler::new(|_, _| ()).param(Param::new("page").default(1));
        let args = DirectInvoker.bind(&handler, &vars()).unwrap();
        assert_eq!(args.value("page"), Some(&json!(1)));
    }

    #[test]
    fn test_direct_missing_parameter() {
        let handler = Handler::new(|_, _| ()).param("bar");
        let err = DirectInvoker.bind(&handler, &vars()).unwrap_err();

        let InvocationError::MissingParameter { name, origin } = err;
        assert_eq!(name, "bar");
        assert_ne!(origin, Origin::UNKNOWN);
    }

    #[test]
    fn test_direct_ignores_declared_type() {
        let handler = Handler::new(|_, _| ()).param(Param::new("db").typed::<Database>());
        assert!(DirectInvoker.bind(&handler, &vars()).is_err());
    }

    #[test]
    fn test_registry_resolves_by_type() {
        let invoker = RegistryInvoker::new(ServiceRegistry::new().with(Database { name: "main" }));
        let handler = Handler::new(|_, _| ())
            .param("post_id")
            .param(Param::new("db").typed::<Database>());

        let args = invoker.bind(&handler, &vars()).unwrap();
        assert_eq!(names(&args), ["post_id", "db"]);
        assert_eq!(args.service::<Database>("db").unwrap().name, "main");
    }

    #[test]
    fn test_registry_default_precedes_lookup() {
        let invoker = RegistryInvoker::new(ServiceRegistry::new().with(5_i64));
        let handler = Handler::new(|_, _| ()).param(Param::new("n").typed::<i64>().default(1));

        let args = invoker.bind(&handler, &vars()).unwrap();
        assert_eq!(args.value("n"), Some(&json!(1)));
    }

    #[test]
    fn test_registry_missing_service() {
        let invoker = RegistryInvoker::new(ServiceRegistry::new());
        let handler = Handler::new(|_, _| ()).param(Param::new("db").typed::<Database>());

        let err = invoker.bind(&handler, &vars()).unwrap_err();
        assert!(matches!(err, InvocationError::MissingParameter { ref name, .. } if name == "db"));
    }

    #[test]
    fn test_shared_container() {
        let container: Rc<dyn Container> =
            Rc::new(ServiceRegistry::new().with(Database { name: "shared" }));
        let first = RegistryInvoker::shared(Rc::clone(&container));
        let second = RegistryInvoker::shared(container);
        let handler = Handler::new(|_, _| ()).param(Param::new("db").typed::<Database>());

        let a = first.bind(&handler, &vars()).unwrap().service::<Database>("db").unwrap();
        let b = second.bind(&handler, &vars()).unwrap().service::<Database>("db").unwrap();
        assert!(Rc::ptr_eq(&a, &b));
        assert_eq!(a.name, "shared");
    }

    #[test]
    fn test_variants_agree_without_lookup() {
        let invoker = RegistryInvoker::new(ServiceRegistry::new().with(Database { name: "x" }));
        let handler = Handler::new(|_, _| ())
            .param("route")
            .param("post_id")
            .param(Param::new("page").default(3));

        let direct = DirectInvoker.bind(&handler, &vars()).unwrap();
        let registry = invoker.bind(&handler, &vars()).unwrap();

        assert_eq!(names(&direct), names(&registry));
        assert_eq!(direct.value("post_id"), registry.value("post_id"));
        assert_eq!(direct.value("page"), registry.value("page"));
    }
}
