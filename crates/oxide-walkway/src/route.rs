//! Route nodes and their pattern/method registries.

use std::collections::HashMap;
use std::rc::Rc;

use serde_json::Value;

use crate::error::Result;
use crate::handler::{Handler, Outcome, MODULE, ROUTE};
use crate::method::method_key;
use crate::module::{Module, ModuleContext};
use crate::resolver;

/// Variables collected while walking a route tree.
///
/// The reserved names `route` and `module` are always considered present;
/// they are bound structurally rather than stored.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Vars {
    values: HashMap<String, Value>,
}

impl Vars {
    /// Creates an empty set of variables.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a variable, shadowing any inherited value.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(name.into(), value.into());
    }

    /// Returns the value of a variable.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// Returns a string variable.
    pub fn str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(Value::as_str)
    }

    /// Returns `true` if `name` can be bound, including reserved names.
    pub fn contains(&self, name: &str) -> bool {
        matches!(name, ROUTE | MODULE) || self.values.contains_key(name)
    }

    /// Returns an iterator over the stored variables.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Returns the number of stored variables.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` if no variables are stored.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Ordered pattern handlers and named method-handlers of one node.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    patterns: Vec<(String, Handler)>,
    methods: HashMap<String, Handler>,
}

impl RouteTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the patterns in registration order.
    pub fn patterns(&self) -> impl Iterator<Item = (&str, &Handler)> {
        self.patterns.iter().map(|(p, h)| (p.as_str(), h))
    }

    /// Returns the number of registered patterns.
    pub fn pattern_count(&self) -> usize {
        self.patterns.len()
    }

    pub(crate) fn set_pattern(&mut self, pattern: &str, handler: Handler) {
        match self.patterns.iter_mut().find(|(p, _)| p == pattern) {
            Some(entry) => entry.1 = handler,
            None => self.patterns.push((pattern.to_string(), handler)),
        }
    }

    pub(crate) fn pattern(&self, pattern: &str) -> Option<&Handler> {
        self.patterns
            .iter()
            .find_map(|(p, h)| (p == pattern).then_some(h))
    }

    pub(crate) fn remove_pattern(&mut self, pattern: &str) -> Option<Handler> {
        let index = self.patterns.iter().position(|(p, _)| p == pattern)?;
        Some(self.patterns.remove(index).1)
    }

    pub(crate) fn set_method(&mut self, name: &str, handler: Handler) {
        self.methods.insert(method_key(name), handler);
    }

    pub(crate) fn method(&self, name: &str) -> Option<&Handler> {
        self.methods.get(&method_key(name))
    }

    pub(crate) fn remove_method(&mut self, name: &str) -> Option<Handler> {
        self.methods.remove(&method_key(name))
    }
}

/// Registration surface shared by route nodes and modules.
///
/// # Example
///
/// ```
/// use oxide_walkway::{Handler, Method, Module, Routes};
///
/// let mut module = Module::new();
/// module.set_pattern("blog", Handler::new(|route, _| {
///     route.set_method(Method::Get, Handler::new(|_, _| "blog index"));
/// }));
///
/// assert!(module.has_pattern("blog"));
/// assert!(!module.has_pattern("shop"));
/// ```
pub trait Routes {
    /// Returns the node's registry.
    fn table(&self) -> &RouteTable;

    /// Returns the node's registry for modification.
    fn table_mut(&mut self) -> &mut RouteTable;

    /// Writes a diagnostic message.
    fn log(&self, message: &str);

    /// Registers `handler` for `pattern`; an existing entry keeps its position.
    fn set_pattern(&mut self, pattern: &str, handler: Handler) {
        self.log(&format!("define pattern: {pattern}"));
        self.table_mut().set_pattern(pattern, handler);
    }

    /// Returns the handler registered for `pattern`.
    fn pattern(&self, pattern: &str) -> Option<&Handler> {
        self.table().pattern(pattern)
    }

    /// Returns `true` if `pattern` is registered.
    fn has_pattern(&self, pattern: &str) -> bool {
        self.pattern(pattern).is_some()
    }

    /// Removes a pattern, returning its handler.
    fn remove_pattern(&mut self, pattern: &str) -> Option<Handler> {
        self.table_mut().remove_pattern(pattern)
    }

    /// Registers a method-handler; names are case-insensitive.
    fn set_method(&mut self, name: impl AsRef<str>, handler: Handler)
    where
        Self: Sized,
    {
        let name = name.as_ref();
        self.log(&format!("define method: {name}"));
        self.table_mut().set_method(name, handler);
    }

    /// Returns the method-handler registered under `name`.
    fn method(&self, name: impl AsRef<str>) -> Option<&Handler>
    where
        Self: Sized,
    {
        self.table().method(name.as_ref())
    }

    /// Returns `true` if a method-handler is registered under `name`.
    fn has_method(&self, name: impl AsRef<str>) -> bool
    where
        Self: Sized,
    {
        self.method(name).is_some()
    }

    /// Removes a method-handler, returning it.
    fn remove_method(&mut self, name: impl AsRef<str>) -> Option<Handler>
    where
        Self: Sized,
    {
        self.table_mut().remove_method(name.as_ref())
    }
}

/// One matched position in a route tree.
///
/// Nodes are created by the resolver, one per matched token, and handed to
/// the handler registered for the matching pattern. That handler may
/// register nested patterns and methods on the node, [`abort`](Self::abort)
/// the resolution, or [`delegate`](Self::delegate) it to another module.
#[derive(Debug, Clone)]
pub struct Route {
    context: Rc<ModuleContext>,
    table: RouteTable,
    parent: Option<Rc<Route>>,
    token: String,
    path: String,
    vars: Vars,
    aborted: bool,
    delegate: Option<Module>,
    module_root: bool,
}

impl Route {
    /// Creates the root node of a module's tree.
    pub(crate) fn root(context: Rc<ModuleContext>, table: RouteTable) -> Self {
        Self {
            context,
            table,
            parent: None,
            token: String::new(),
            path: String::new(),
            vars: Vars::new(),
            aborted: false,
            delegate: None,
            module_root: true,
        }
    }

    /// Creates a child node for `token`, inheriting a copy of the variables.
    pub(crate) fn descend(self, token: &str) -> Self {
        let path = if self.path.is_empty() {
            token.to_string()
        } else {
            format!("{}/{token}", self.path)
        };

        Self {
            context: Rc::clone(&self.context),
            table: RouteTable::new(),
            vars: self.vars.clone(),
            token: token.to_string(),
            path,
            parent: Some(Rc::new(self)),
            aborted: false,
            delegate: None,
            module_root: false,
        }
    }

    /// Splices `module`'s root onto `at`, sharing its token and path.
    pub(crate) fn mount(module: Module, at: Self) -> Self {
        let (context, table) = module.into_parts();

        Self {
            context,
            table,
            vars: at.vars.clone(),
            token: at.token.clone(),
            path: at.path.clone(),
            parent: Some(Rc::new(at)),
            aborted: false,
            delegate: None,
            module_root: true,
        }
    }

    /// Returns the parent node, or `None` at the top of the tree.
    pub fn parent(&self) -> Option<&Route> {
        self.parent.as_deref()
    }

    pub(crate) fn into_parent(self) -> Option<Self> {
        self.parent
            .map(|parent| Rc::try_unwrap(parent).unwrap_or_else(|shared| (*shared).clone()))
    }

    /// Returns the token matched to reach this node.
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Returns the path from the top of the tree to this node.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Returns the variables visible at this node.
    pub fn vars(&self) -> &Vars {
        &self.vars
    }

    pub(crate) fn vars_mut(&mut self) -> &mut Vars {
        &mut self.vars
    }

    /// Returns the module owning this node.
    pub fn module(&self) -> &ModuleContext {
        &self.context
    }

    pub(crate) fn context(&self) -> &Rc<ModuleContext> {
        &self.context
    }

    /// Returns `true` if this node is the root of its module.
    pub fn is_module_root(&self) -> bool {
        self.module_root
    }

    /// Returns the node at which the owning module is rooted.
    pub fn module_root(&self) -> &Route {
        let mut node = self;
        while !node.module_root {
            match node.parent() {
                Some(parent) => node = parent,
                None => break,
            }
        }
        node
    }

    /// Stops the current resolution; it will report no match.
    pub fn abort(&mut self) {
        self.aborted = true;
    }

    /// Returns `true` if [`abort`](Self::abort) was called.
    pub fn is_aborted(&self) -> bool {
        self.aborted
    }

    /// Continues the current resolution inside `module`.
    pub fn delegate(&mut self, module: Module) {
        self.delegate = Some(module);
    }

    pub(crate) fn take_delegate(&mut self) -> Option<Module> {
        self.delegate.take()
    }

    /// Invokes `handler` with parameters bound from this node's variables.
    pub fn invoke(&mut self, handler: &Handler) -> Result<Option<Value>> {
        let args = self.context.invoker().bind(handler, &self.vars)?;
        Ok(handler.call(self, &args))
    }

    /// Runs the method-handler registered under `method`.
    pub fn execute(&mut self, method: impl AsRef<str>) -> Result<Outcome> {
        let Some(handler) = self.table.method(method.as_ref()).cloned() else {
            return Ok(Outcome::NoHandler);
        };

        Ok(Outcome::from(self.invoke(&handler)?))
    }

    /// Resolves `path` relative to this node.
    pub fn resolve(self, path: &str) -> Result<Option<Route>> {
        resolver::resolve(self, path)
    }
}

impl Routes for Route {
    fn table(&self) -> &RouteTable {
        &self.table
    }

    fn table_mut(&mut self) -> &mut RouteTable {
        &mut self.table
    }

    fn log(&self, message: &str) {
        self.context.log(message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::method::Method;
    use serde_json::json;

    fn root() -> Route {
        Module::new().root()
    }

    #[test]
    fn test_descend_builds_path() {
        let child = root().descend("blog");
        assert_eq!(child.path(), "blog");
        assert_eq!(child.token(), "blog");

        let grandchild = child.descend("posts");
        assert_eq!(grandchild.path(), "blog/posts");
        assert_eq!(grandchild.parent().unwrap().path(), "blog");
        assert!(grandchild.parent().unwrap().parent().unwrap().is_module_root());
    }

    #[test]
    fn test_child_vars_do_not_leak_to_parent() {
        let mut child = root().descend("a");
        child.vars_mut().insert("x", "1");

        let mut grandchild = child.descend("b");
        grandchild.vars_mut().insert("x", "2");

        assert_eq!(grandchild.vars().str("x"), Some("2"));
        assert_eq!(grandchild.parent().unwrap().vars().str("x"), Some("1"));
    }

    #[test]
    fn test_reserved_vars_always_present() {
        let vars = Vars::new();
        assert!(vars.contains("route"));
        assert!(vars.contains("module"));
        assert!(!vars.contains("post_id"));
        assert!(vars.is_empty());
    }

    #[test]
    fn test_pattern_registry() {
        let mut route = root();
        let handler = Handler::new(|_, _| ());

        route.set_pattern("foo", handler.clone());
        assert!(route.has_pattern("foo"));
        assert!(route.pattern("foo").unwrap().ptr_eq(&handler));
        assert!(!route.has_pattern("bar"));

        route.remove_pattern("foo");
        assert!(!route.has_pattern("foo"));
    }

    #[test]
    fn test_pattern_replacement_keeps_order() {
        let mut route = root();
        route.set_pattern("a", Handler::new(|_, _| ()));
        route.set_pattern("b", Handler::new(|_, _| ()));
        route.set_pattern("a", Handler::new(|_, _| ()));

        let order: Vec<_> = route.table().patterns().map(|(p, _)| p).collect();
        assert_eq!(order, ["a", "b"]);
    }

    #[test]
    fn test_methods_are_case_insensitive() {
        let mut route = root();
        route.set_method("GET", Handler::new(|_, _| "ok"));

        assert!(route.has_method("get"));
        assert!(route.has_method(Method::Get));
        assert_eq!(route.execute("Get").unwrap(), Outcome::Value(json!("ok")));
        assert_eq!(route.execute(Method::Post).unwrap(), Outcome::NoHandler);
    }

    #[test]
    fn test_execute_without_value() {
        let mut route = root();
        route.set_method(Method::Delete, Handler::new(|_, _| ()));
        assert_eq!(route.execute("delete").unwrap(), Outcome::Completed);
    }

    #[test]
    fn test_abort_and_delegate_flags() {
        let mut route = root().descend("x");
        assert!(!route.is_aborted());
        route.abort();
        assert!(route.is_aborted());

        route.delegate(Module::named("nested"));
        assert_eq!(route.take_delegate().unwrap().name(), "nested");
        assert!(route.take_delegate().is_none());
    }

    #[test]
    fn test_mount_shares_path() {
        let child = root().descend("blog").descend("comments");
        let mounted = Route::mount(Module::named("comments"), child);

        assert!(mounted.is_module_root());
        assert_eq!(mounted.path(), "blog/comments");
        assert_eq!(mounted.parent().unwrap().path(), "blog/comments");
        assert_eq!(mounted.module().name(), "comments");
        assert_eq!(mounted.module_root().path(), "blog/comments");
    }
}
