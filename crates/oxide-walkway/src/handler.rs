//! Handlers and their parameter descriptors.

use std::any::Any;
use std::fmt;
use std::panic::Location;
use std::rc::Rc;

use serde_json::Value;

use crate::error::Origin;
use crate::route::Route;

/// Reserved parameter name bound to the current route node.
pub const ROUTE: &str = "route";

/// Reserved parameter name bound to the owning module.
pub const MODULE: &str = "module";

/// Value produced by a handler; `None` means "no value".
///
/// A `null` returned by a handler is treated as "no value" as well.
pub type Output = Option<Value>;

/// The type-erased handler body.
pub type HandlerFn = dyn Fn(&mut Route, &Args) -> Output;

/// Conversion of handler return values into an [`Output`].
pub trait IntoOutput {
    /// Converts `self` into an output.
    fn into_output(self) -> Output;
}

impl IntoOutput for () {
    fn into_output(self) -> Output {
        None
    }
}

impl IntoOutput for Value {
    fn into_output(self) -> Output {
        match self {
            Self::Null => None,
            value => Some(value),
        }
    }
}

impl IntoOutput for Option<Value> {
    fn into_output(self) -> Output {
        self.and_then(Value::into_output)
    }
}

impl IntoOutput for String {
    fn into_output(self) -> Output {
        Some(Value::String(self))
    }
}

impl IntoOutput for &str {
    fn into_output(self) -> Output {
        Some(Value::String(self.to_string()))
    }
}

impl IntoOutput for bool {
    fn into_output(self) -> Output {
        Some(Value::Bool(self))
    }
}

/// Declaration of a single handler parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    name: String,
    default: Option<Value>,
    type_key: Option<String>,
}

impl Param {
    /// Declares a parameter with no default and no declared type.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            default: None,
            type_key: None,
        }
    }

    /// Sets the value used when nothing else satisfies the parameter.
    #[must_use]
    pub fn default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Declares the parameter's type, for registry-backed invokers.
    #[must_use]
    pub fn typed<T: ?Sized + 'static>(mut self) -> Self {
        self.type_key = Some(std::any::type_name::<T>().to_string());
        self
    }

    /// Declares the parameter's type by an explicit registry key.
    #[must_use]
    pub fn type_key(mut self, key: impl Into<String>) -> Self {
        self.type_key = Some(key.into());
        self
    }

    /// Returns the parameter name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the declared default, if any.
    pub fn default_value(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    /// Returns the declared type key, if any.
    pub fn declared_type(&self) -> Option<&str> {
        self.type_key.as_deref()
    }
}

impl From<&str> for Param {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for Param {
    fn from(name: String) -> Self {
        Self::new(name)
    }
}

/// A bound argument.
#[derive(Clone)]
pub enum Arg {
    /// The reserved `route` binding; the node is the handler's first argument.
    Route,
    /// The reserved `module` binding; reachable through [`Route::module`].
    Module,
    /// A captured, default or otherwise supplied value.
    Value(Value),
    /// A service supplied by an external registry.
    Service(Rc<dyn Any>),
}

impl fmt::Debug for Arg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Route => f.write_str("Route"),
            Self::Module => f.write_str("Module"),
            Self::Value(value) => f.debug_tuple("Value").field(value).finish(),
            Self::Service(_) => f.write_str("Service(..)"),
        }
    }
}

/// Arguments bound for one handler call, in declaration order.
#[derive(Debug, Clone, Default)]
pub struct Args {
    bound: Vec<(String, Arg)>,
}

impl Args {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            bound: Vec::with_capacity(capacity),
        }
    }

    pub(crate) fn push(&mut self, name: &str, arg: Arg) {
        self.bound.push((name.to_string(), arg));
    }

    /// Returns the argument bound to `name`.
    pub fn get(&self, name: &str) -> Option<&Arg> {
        self.bound
            .iter()
            .find_map(|(key, arg)| (key == name).then_some(arg))
    }

    /// Returns the value bound to `name`, if it is a plain value.
    pub fn value(&self, name: &str) -> Option<&Value> {
        match self.get(name)? {
            Arg::Value(value) => Some(value),
            _ => None,
        }
    }

    /// Returns the value bound to `name` as a string slice.
    pub fn str(&self, name: &str) -> Option<&str> {
        self.value(name).and_then(Value::as_str)
    }

    /// Parses the string bound to `name`.
    pub fn parse<T: std::str::FromStr>(&self, name: &str) -> Option<T> {
        self.str(name).and_then(|v| v.parse().ok())
    }

    /// Returns the service bound to `name`, downcast to `T`.
    pub fn service<T: 'static>(&self, name: &str) -> Option<Rc<T>> {
        match self.get(name)? {
            Arg::Service(service) => Rc::clone(service).downcast::<T>().ok(),
            _ => None,
        }
    }

    /// Returns the bound parameter names, in declaration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.bound.iter().map(|(name, _)| name.as_str())
    }

    /// Returns the number of bound arguments.
    pub fn len(&self) -> usize {
        self.bound.len()
    }

    /// Returns `true` if no arguments were bound.
    pub fn is_empty(&self) -> bool {
        self.bound.is_empty()
    }

    /// Returns an iterator over the bound arguments.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Arg)> {
        self.bound.iter().map(|(name, arg)| (name.as_str(), arg))
    }
}

/// A route-definition or method-handler function with its parameter list.
///
/// # Example
///
/// ```
/// use oxide_walkway::{Handler, Param};
///
/// let handler = Handler::new(|_route, args| {
///     format!("page {}", args.str("page").unwrap_or("?"))
/// })
/// .param("page")
/// .param(Param::new("per_page").default(20));
///
/// assert_eq!(handler.params().len(), 2);
/// ```
#[derive(Clone)]
pub struct Handler {
    params: Vec<Param>,
    func: Rc<HandlerFn>,
    origin: &'static Location<'static>,
}

impl Handler {
    /// Wraps a closure; the call site is recorded for diagnostics.
    #[track_caller]
    pub fn new<F, R>(func: F) -> Self
    where
        F: Fn(&mut Route, &Args) -> R + 'static,
        R: IntoOutput,
    {
        Self {
            params: Vec::new(),
            func: Rc::new(move |route: &mut Route, args: &Args| func(route, args).into_output()),
            origin: Location::caller(),
        }
    }

    /// Declares the next parameter.
    #[must_use]
    pub fn param(mut self, param: impl Into<Param>) -> Self {
        self.params.push(param.into());
        self
    }

    /// Returns the declared parameters.
    pub fn params(&self) -> &[Param] {
        &self.params
    }

    /// Returns where the handler was created.
    pub fn origin(&self) -> Origin {
        Origin::from(self.origin)
    }

    pub(crate) fn call(&self, route: &mut Route, args: &Args) -> Output {
        (self.func)(route, args)
    }

    /// Returns `true` if both handles share the same function.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.func, &other.func)
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handler")
            .field("params", &self.params)
            .field("origin", &self.origin)
            .finish_non_exhaustive()
    }
}

/// Result of executing a method-handler.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// No handler is registered for the method.
    NoHandler,
    /// The handler ran and returned no value.
    Completed,
    /// The handler returned a value.
    Value(Value),
}

impl Outcome {
    /// Returns `true` unless no handler was found.
    pub fn is_handled(&self) -> bool {
        !matches!(self, Self::NoHandler)
    }

    /// Returns the returned value, if any.
    pub fn value(&self) -> Option<&Value> {
        match self {
            Self::Value(value) => Some(value),
            _ => None,
        }
    }

    /// Encodes the outcome as `false`, `true` or the returned value.
    pub fn into_value(self) -> Value {
        match self {
            Self::NoHandler => Value::Bool(false),
            Self::Completed => Value::Bool(true),
            Self::Value(value) => value,
        }
    }
}

impl From<Output> for Outcome {
    fn from(output: Output) -> Self {
        output.map_or(Self::Completed, Self::Value)
    }
}
