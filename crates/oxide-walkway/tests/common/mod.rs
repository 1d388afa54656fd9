#![allow(dead_code)]

use oxide_walkway::prelude::*;
use serde_json::json;

/// A self-contained comments section, mounted wherever a route delegates to it.
pub fn comment_module() -> Module {
    let mut module = Module::named("comments");

    module.set_pattern(
        "submit",
        Handler::new(|route, _| {
            route.set_method(
                Method::Get,
                Handler::new(|route, _| {
                    route.log("displaying comment submission form");
                    "comment form"
                }),
            );
        }),
    );

    module.set_method(
        Method::Get,
        Handler::new(|route, _| {
            route.log("displaying comments");
            "comments"
        }),
    );

    module
}

/// The reference blog tree:
///
/// ```text
/// blog
/// ├── tags/<tag:slug>
/// └── posts
///     ├── <post_id:int>          (aborts for 99)
///     │   ├── edit
///     │   └── comments           (delegates to `comment_module`)
///     └── <year:int>-<month:int>
///         └── page<page:int>
/// ```
pub fn blog_module() -> Module {
    let mut module = Module::new();

    module.set_pattern(
        "blog",
        Handler::new(|route, _| {
            route.set_pattern(
                "tags/<tag:slug>",
                Handler::new(|route, _| {
                    route.set_method(
                        Method::Get,
                        Handler::new(|_, args| args.value("tag").cloned()).param("tag"),
                    );
                }),
            );

            route.set_pattern(
                "posts",
                Handler::new(|route, _| {
                    route.set_pattern(
                        "<post_id:int>",
                        Handler::new(post).param("route").param("post_id"),
                    );
                    route.set_pattern("<year:int>-<month:int>", Handler::new(archive));
                }),
            );
        }),
    );

    module.set_method(Method::Get, Handler::new(|_, _| "hello"));

    module
}

fn post(route: &mut Route, args: &Args) {
    if args.str("post_id") == Some("99") {
        route.abort();
    }

    route.set_pattern(
        "edit",
        Handler::new(|route, _| {
            route.set_method(
                Method::Get,
                Handler::new(|_, args| json!({ "post_id": args.value("post_id") }))
                    .param("post_id"),
            );
        }),
    );

    route.set_method(
        Method::Get,
        Handler::new(|route, args| {
            route.log(&format!(
                "displaying post number {}",
                args.str("post_id").unwrap_or_default()
            ));
        })
        .param("route")
        .param("post_id"),
    );

    route.set_pattern(
        "comments",
        Handler::new(|route, _| route.delegate(comment_module())),
    );
}

fn archive(route: &mut Route, _: &Args) {
    route.set_pattern(
        "page<page:int>",
        Handler::new(|route, _| {
            route.set_method(
                Method::Get,
                Handler::new(|_, args| {
                    json!({
                        "year": args.value("year"),
                        "month": args.value("month"),
                        "page": args.value("page"),
                    })
                })
                .param("page")
                .param("year")
                .param("month"),
            );
        }),
    );

    route.set_method(
        Method::Get,
        Handler::new(|_, args| json!({ "year": args.value("year"), "month": args.value("month") }))
            .param("year")
            .param("month"),
    );
}

/// Resolves `path` against `module`, panicking if it does not resolve.
pub fn resolve(module: &Module, path: &str) -> Route {
    module
        .resolve(path)
        .unwrap_or_else(|e| panic!("Failed to resolve: {path}\nError: {e:?}"))
        .unwrap_or_else(|| panic!("Expected a match for: {path}"))
}

/// Resolves `path` and runs its `get` handler.
pub fn get(module: &Module, path: &str) -> Outcome {
    resolve(module, path)
        .execute(Method::Get)
        .unwrap_or_else(|e| panic!("Failed to execute GET {path}\nError: {e:?}"))
}
