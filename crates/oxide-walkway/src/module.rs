//! Modules: independently configured roots of route trees.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::rc::Rc;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::error::{Result, RoutingError};
use crate::handler::Outcome;
use crate::invoker::{DirectInvoker, Invoker};
use crate::pattern::{Preprocessor, Substitution, Symbols};
use crate::route::{Route, RouteTable, Routes};

/// Callback receiving diagnostic messages.
pub type LogHook = dyn Fn(&str);

/// Maximum number of compiled patterns kept per module.
pub(crate) const COMPILED_CACHE_LIMIT: usize = 256;

/// Serializable module settings.
///
/// ```
/// use oxide_walkway::{Module, ModuleOptions};
///
/// let options: ModuleOptions = serde_json::from_str(
///     r#"{ "name": "api", "symbols": { "uuid": "[0-9a-f-]{36}" } }"#,
/// ).unwrap();
///
/// let module = Module::with_options(options);
/// assert_eq!(module.name(), "api");
/// assert!(module.symbols().contains_key("int"));
/// assert!(module.symbols().contains_key("uuid"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModuleOptions {
    /// Label used in diagnostics.
    pub name: String,
    /// Match patterns without regard to case.
    pub case_insensitive: bool,
    /// Treat `.` and `..` path segments as relative navigation.
    pub relative_navigation: bool,
    /// Symbols added to (or overriding) the built-in table.
    pub symbols: BTreeMap<String, String>,
}

impl Default for ModuleOptions {
    fn default() -> Self {
        Self {
            name: "module".to_string(),
            case_insensitive: true,
            relative_navigation: false,
            symbols: BTreeMap::new(),
        }
    }
}

impl ModuleOptions {
    /// Sets the module label.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Enables or disables case-insensitive matching.
    #[must_use]
    pub fn case_insensitive(mut self, enabled: bool) -> Self {
        self.case_insensitive = enabled;
        self
    }

    /// Enables or disables `.`/`..` navigation.
    #[must_use]
    pub fn relative_navigation(mut self, enabled: bool) -> Self {
        self.relative_navigation = enabled;
        self
    }

    /// Adds a symbol.
    #[must_use]
    pub fn symbol(mut self, name: impl Into<String>, pattern: impl Into<String>) -> Self {
        self.symbols.insert(name.into(), pattern.into());
        self
    }
}

/// Configuration shared by every node of a module's tree.
#[derive(Clone)]
pub struct ModuleContext {
    name: String,
    preprocessor: Preprocessor,
    on_log: Option<Rc<LogHook>>,
    invoker: Rc<dyn Invoker>,
    case_insensitive: bool,
    relative_navigation: bool,
    compiled: RefCell<HashMap<String, Regex>>,
}

impl ModuleContext {
    fn new(options: ModuleOptions) -> Self {
        let mut preprocessor = Preprocessor::new();
        preprocessor.symbols_mut().extend(options.symbols);

        Self {
            name: options.name,
            preprocessor,
            on_log: None,
            invoker: Rc::new(DirectInvoker),
            case_insensitive: options.case_insensitive,
            relative_navigation: options.relative_navigation,
            compiled: RefCell::new(HashMap::new()),
        }
    }

    /// Returns the module label.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Sends `message` to the log hook, if one is set.
    ///
    /// Messages are also emitted as `trace` events.
    pub fn log(&self, message: &str) {
        trace!(module = %self.name, "{message}");

        if let Some(hook) = &self.on_log {
            hook(message);
        }
    }

    /// Applies the module's substitution rules to `pattern`.
    pub fn prepare(&self, pattern: &str) -> std::result::Result<String, RoutingError> {
        self.preprocessor.prepare(pattern)
    }

    /// Returns the module's preprocessor.
    pub fn preprocessor(&self) -> &Preprocessor {
        &self.preprocessor
    }

    /// Returns the symbol table.
    pub fn symbols(&self) -> &Symbols {
        self.preprocessor.symbols()
    }

    /// Returns the invoker used for every handler in the tree.
    pub fn invoker(&self) -> &dyn Invoker {
        self.invoker.as_ref()
    }

    /// Returns `true` if patterns match without regard to case.
    pub fn is_case_insensitive(&self) -> bool {
        self.case_insensitive
    }

    /// Returns `true` if `.` and `..` segments navigate the tree.
    pub fn has_relative_navigation(&self) -> bool {
        self.relative_navigation
    }

    /// Compiles a prepared pattern, anchored at the front of the remaining
    /// path and followed by a separator or the end of the path.
    pub(crate) fn compile(&self, prepared: &str) -> std::result::Result<Regex, regex::Error> {
        if let Some(regex) = self.compiled.borrow().get(prepared) {
            return Ok(regex.clone());
        }

        let flags = if self.case_insensitive { "(?i)" } else { "" };
        let regex = Regex::new(&format!("{flags}^(?:{prepared})(?:/|$)"))?;

        let mut compiled = self.compiled.borrow_mut();
        if compiled.len() >= COMPILED_CACHE_LIMIT {
            compiled.clear();
        }
        compiled.insert(prepared.to_string(), regex.clone());

        Ok(regex)
    }
}

impl fmt::Debug for ModuleContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleContext")
            .field("name", &self.name)
            .field("preprocessor", &self.preprocessor)
            .field("on_log", &self.on_log.is_some())
            .field("case_insensitive", &self.case_insensitive)
            .field("relative_navigation", &self.relative_navigation)
            .finish_non_exhaustive()
    }
}

/// The root of an independent route tree.
///
/// A module owns the patterns and methods registered at its root, the
/// pattern preprocessor, an optional log hook and the [`Invoker`] used for
/// every handler in its tree. Configure it once, then resolve as many paths
/// as needed; each resolution builds a fresh chain of [`Route`] nodes.
///
/// # Example
///
/// ```
/// use oxide_walkway::{Handler, Method, Module, Outcome, Routes};
///
/// let mut module = Module::new();
/// module.set_pattern("users", Handler::new(|route, _| {
///     route.set_pattern("<user_id:int>", Handler::new(|route, _| {
///         route.set_method(
///             Method::Get,
///             Handler::new(|_, args| format!("user {}", args.str("user_id").unwrap_or_default()))
///                 .param("user_id"),
///         );
///     }));
/// }));
///
/// let mut route = module.resolve("/users/7").unwrap().unwrap();
/// assert_eq!(route.path(), "users/7");
/// assert_eq!(route.execute(Method::Get).unwrap(), Outcome::Value("user 7".into()));
///
/// assert!(module.resolve("users/seven").unwrap().is_none());
/// ```
#[derive(Debug, Clone)]
pub struct Module {
    context: Rc<ModuleContext>,
    table: RouteTable,
}

impl Default for Module {
    fn default() -> Self {
        Self::new()
    }
}

impl Module {
    /// Creates a module with default options.
    pub fn new() -> Self {
        Self::with_options(ModuleOptions::default())
    }

    /// Creates a module with default options and the given label.
    pub fn named(name: impl Into<String>) -> Self {
        Self::with_options(ModuleOptions::default().name(name))
    }

    /// Creates a module from options.
    pub fn with_options(options: ModuleOptions) -> Self {
        Self {
            context: Rc::new(ModuleContext::new(options)),
            table: RouteTable::new(),
        }
    }

    /// Replaces the invoker used for every handler in the tree.
    #[must_use]
    pub fn with_invoker(mut self, invoker: impl Invoker + 'static) -> Self {
        self.context_mut().invoker = Rc::new(invoker);
        self
    }

    fn context_mut(&mut self) -> &mut ModuleContext {
        Rc::make_mut(&mut self.context)
    }

    /// Returns the module label.
    pub fn name(&self) -> &str {
        self.context.name()
    }

    /// Returns the shared configuration handed to every node.
    pub fn context(&self) -> &ModuleContext {
        &self.context
    }

    /// Installs a hook receiving diagnostic messages.
    pub fn on_log(&mut self, hook: impl Fn(&str) + 'static) {
        self.context_mut().on_log = Some(Rc::new(hook));
    }

    /// Removes the log hook.
    pub fn clear_log_hook(&mut self) {
        self.context_mut().on_log = None;
    }

    /// Applies the module's substitution rules to `pattern`.
    pub fn prepare(&self, pattern: &str) -> std::result::Result<String, RoutingError> {
        self.context.prepare(pattern)
    }

    /// Appends a substitution rule.
    pub fn add_substitution(&mut self, substitution: Substitution) {
        let context = self.context_mut();
        context.preprocessor.add_substitution(substitution);
        context.compiled.get_mut().clear();
    }

    /// Defines or replaces a symbol.
    pub fn insert_symbol(&mut self, name: impl Into<String>, pattern: impl Into<String>) {
        let context = self.context_mut();
        context.preprocessor.insert_symbol(name, pattern);
        context.compiled.get_mut().clear();
    }

    /// Returns the symbol table.
    pub fn symbols(&self) -> &Symbols {
        self.context.symbols()
    }

    /// Returns the preprocessor for modification.
    pub fn preprocessor_mut(&mut self) -> &mut Preprocessor {
        let context = self.context_mut();
        context.compiled.get_mut().clear();
        &mut context.preprocessor
    }

    /// Enables or disables case-insensitive matching.
    pub fn set_case_insensitive(&mut self, enabled: bool) {
        let context = self.context_mut();
        context.case_insensitive = enabled;
        context.compiled.get_mut().clear();
    }

    /// Enables or disables `.`/`..` navigation.
    pub fn set_relative_navigation(&mut self, enabled: bool) {
        self.context_mut().relative_navigation = enabled;
    }

    /// Returns a fresh root node for this module's tree.
    pub fn root(&self) -> Route {
        Route::root(Rc::clone(&self.context), self.table.clone())
    }

    /// Walks `path` from the root.
    ///
    /// Returns `Ok(None)` if the path does not resolve.
    pub fn resolve(&self, path: &str) -> Result<Option<Route>> {
        self.root().resolve(path)
    }

    /// Resolves `path` and runs its `method` handler.
    ///
    /// Returns `Ok(None)` if the path does not resolve.
    pub fn dispatch(&self, path: &str, method: impl AsRef<str>) -> Result<Option<Outcome>> {
        match self.resolve(path)? {
            Some(mut route) => route.execute(method).map(Some),
            None => Ok(None),
        }
    }

    pub(crate) fn into_parts(self) -> (Rc<ModuleContext>, RouteTable) {
        (self.context, self.table)
    }
}

impl Routes for Module {
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
