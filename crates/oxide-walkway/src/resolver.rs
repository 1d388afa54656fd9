//! The path-walking state machine.
//!
//! Resolution consumes the path one token at a time. At each node the
//! registered patterns are tried in registration order against the front of
//! the remaining path; the first pattern that matches up to a separator (or
//! the end of the path) wins. Its handler is invoked on a freshly created
//! child node, which then becomes the current node.

use std::rc::Rc;

use tracing::debug;

use crate::error::{Result, RoutingError};
use crate::handler::Handler;
use crate::module::ModuleContext;
use crate::route::{Route, Routes};

/// A successful match of one pattern at the current node.
struct Step {
    pattern: String,
    token: String,
    captures: Vec<(String, String)>,
    handler: Handler,
}

/// Walks `path` starting at `start`.
///
/// Diagnostics go to the module `start` belongs to for the whole walk, even
/// after a handler delegated to another module.
///
/// Returns the deepest matched node, or `None` if some token matched no
/// pattern, a node had no patterns left to try, or a handler aborted.
pub(crate) fn resolve(start: Route, path: &str) -> Result<Option<Route>> {
    let logger = Rc::clone(start.context());
    let mut remaining = path.trim_matches('/');
    let mut route = start;
    let mut iteration = 0_usize;

    while !remaining.is_empty() {
        iteration += 1;

        logger.log(&format!(
            "* resolving partial path '{remaining}' (iteration {iteration} of path '{path}')"
        ));

        if route.module().has_relative_navigation() {
            let segment = remaining.split('/').next().unwrap_or_default();

            match segment {
                "." => {
                    remaining = advance(remaining, segment.len());
                    continue;
                }
                ".." => {
                    route = leave(route)?;
                    remaining = advance(remaining, segment.len());
                    continue;
                }
                _ => {}
            }
        }

        if route.table().pattern_count() == 0 {
            logger.log("end of routes - no match found");
            return Ok(None);
        }

        let Some(step) = match_step(&logger, &route, remaining)? else {
            logger.log("no pattern matched");
            debug!(path, remaining, "no route matched");
            return Ok(None);
        };

        remaining = advance(remaining, step.token.len());

        match enter(&logger, route, step)? {
            Some(next) => route = next,
            None => {
                debug!(path, "resolution aborted");
                return Ok(None);
            }
        }
    }

    debug!(path, resolved = route.path(), "route resolved");

    Ok(Some(route))
}

/// Drops a consumed token and its trailing separator.
fn advance(remaining: &str, consumed: usize) -> &str {
    remaining.get(consumed + 1..).unwrap_or_default()
}

/// Moves one token up the tree.
///
/// A mounted module root shares its path with the node that delegated to
/// it, so both are left together.
fn leave(route: Route) -> Result<Route> {
    let here = route.path().to_string();
    let mounted = route.is_module_root();

    let mut parent = route
        .into_parent()
        .ok_or_else(|| RoutingError::NoParent { path: here.clone() })?;

    if mounted {
        parent = parent
            .into_parent()
            .ok_or(RoutingError::NoParent { path: here })?;
    }

    Ok(parent)
}

/// Finds the first pattern of `route` matching the front of `remaining`.
fn match_step(logger: &ModuleContext, route: &Route, remaining: &str) -> Result<Option<Step>> {
    let module = route.module();

    for (raw, handler) in route.table().patterns() {
        let pattern = module.prepare(raw)?;

        logger.log(&format!("testing pattern '{pattern}'"));

        let regex = module
            .compile(&pattern)
            .map_err(|source| RoutingError::MalformedPattern {
                pattern: pattern.clone(),
                source,
                origin: handler.origin(),
            })?;

        let Some(caps) = regex.captures(remaining) else {
            continue;
        };

        // the match includes the separator unless it ran to the end
        let end = caps.get(0).map_or(0, |m| m.end());
        let token_end = if end < remaining.len() {
            end.saturating_sub(1)
        } else {
            end
        };
        let token = remaining.get(..token_end).unwrap_or_default().to_string();

        let mut captures = Vec::new();

        for (index, name) in regex.capture_names().enumerate().skip(1) {
            let Some(name) = name else {
                return Err(RoutingError::MixedCaptures {
                    pattern,
                    origin: handler.origin(),
                }
                .into());
            };

            if let Some(value) = caps.get(index) {
                captures.push((name.to_string(), value.as_str().to_string()));
            }
        }

        return Ok(Some(Step {
            pattern,
            token,
            captures,
            handler: handler.clone(),
        }));
    }

    Ok(None)
}

/// Creates the child node for `step` and runs its handler.
///
/// Returns the node to continue from, which is the delegate module's root
/// if the handler delegated, or `None` if it aborted.
fn enter(logger: &ModuleContext, route: Route, step: Step) -> Result<Option<Route>> {
    logger.log(&format!(
        "token '{}' matched by pattern '{}'",
        step.token, step.pattern
    ));

    let mut child = route.descend(&step.token);

    for (name, value) in step.captures {
        logger.log(&format!("captured named variable '{name}' as '{value}'"));
        child.vars_mut().insert(name, value);
    }

    child.invoke(&step.handler)?;

    if child.is_aborted() {
        logger.log("aborted");
        return Ok(None);
    }

    if let Some(module) = child.take_delegate() {
        logger.log(&format!("delegating routing to {}", module.name()));
        return Ok(Some(Route::mount(module, child)));
    }

    Ok(Some(child))
}
