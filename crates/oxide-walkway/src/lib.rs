//! # oxide-walkway
//!
//! A modular, hierarchical path router.
//!
//! Instead of registering complete paths up front, a route tree is described
//! by nested definition functions. Resolving a path walks the tree one token
//! at a time: each registered pattern is a regular expression matched
//! against the front of the remaining path, and the handler of the first
//! matching pattern is run on a newly created [`Route`] node, where it may
//! register further patterns, define method-handlers, abort the resolution,
//! or delegate the rest of the path to another [`Module`].
//!
//! This crate provides:
//! - Ordered, first-match-wins regex patterns per node
//! - `<name:symbol>` placeholders expanded through a symbol table
//! - Named captures inherited by every descendant node
//! - Handlers whose parameters are bound by name, default or registry lookup
//! - Method-handlers (`get`, `post`, ...) executed on the resolved node
//! - Delegation to independently configured modules
//!
//! ## Quick Start
//!
//! ```
//! use oxide_walkway::{Handler, Method, Module, Outcome, Routes};
//! use serde_json::json;
//!
//! let mut module = Module::new();
//!
//! module.set_pattern("blog", Handler::new(|route, _| {
//!     route.set_pattern("posts", Handler::new(|route, _| {
//!         route.set_pattern("<post_id:int>", Handler::new(|route, args| {
//!             if args.str("post_id") == Some("99") {
//!                 route.abort();
//!             }
//!
//!             route.set_method(
//!                 Method::Get,
//!                 Handler::new(|_, args| json!({ "post_id": args.value("post_id") }))
//!                     .param("post_id"),
//!             );
//!         }).param("post_id"));
//!     }));
//! }));
//!
//! let mut route = module.resolve("blog/posts/42").unwrap().unwrap();
//! assert_eq!(route.path(), "blog/posts/42");
//! assert_eq!(
//!     route.execute(Method::Get).unwrap(),
//!     Outcome::Value(json!({ "post_id": "42" })),
//! );
//!
//! assert!(module.resolve("blog/posts/99").unwrap().is_none());
//! assert!(module.resolve("shop").unwrap().is_none());
//! ```
//!
//! ## Patterns
//!
//! Patterns are anchored at the front of the remaining path and must end at
//! a separator or at the end of the path, so a single pattern may span
//! several segments (`tags/<tag:slug>`). Patterns are tried in registration
//! order and the first match wins. Matching is case-insensitive unless
//! disabled through [`ModuleOptions`].
//!
//! Only named capture groups are allowed; an unnamed group is reported as
//! [`RoutingError::MixedCaptures`] when its pattern matches.
//!
//! ## Delegation
//!
//! ```
//! use oxide_walkway::{Handler, Module, Routes};
//!
//! fn comments() -> Module {
//!     let mut module = Module::named("comments");
//!     module.set_pattern("submit", Handler::new(|_, _| ()));
//!     module
//! }
//!
//! let mut module = Module::new();
//! module.set_pattern("comments", Handler::new(|route, _| route.delegate(comments())));
//!
//! let route = module.resolve("comments/submit").unwrap().unwrap();
//! assert_eq!(route.module().name(), "comments");
//! assert_eq!(route.module_root().path(), "comments");
//! ```

mod error;
mod handler;
mod invoker;
mod method;
mod module;
mod pattern;
mod resolver;
mod route;

pub use error::{Error, InvocationError, Origin, Result, RoutingError};
pub use handler::{Arg, Args, Handler, HandlerFn, IntoOutput, Outcome, Output, Param, MODULE, ROUTE};
pub use invoker::{Container, DirectInvoker, Invoker, RegistryInvoker, ServiceRegistry};
pub use method::Method;
pub use module::{LogHook, Module, ModuleContext, ModuleOptions};
pub use pattern::{default_symbols, Preprocessor, ReplaceFn, Substitution, Symbols, PLACEHOLDER_PATTERN};
pub use route::{Route, RouteTable, Routes, Vars};

/// Commonly used types, including the [`Routes`] registration trait.
pub mod prelude {
    pub use crate::{
        Args, Handler, Method, Module, ModuleOptions, Outcome, Param, Route, Routes,
    };
}
