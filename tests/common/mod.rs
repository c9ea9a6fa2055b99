//! Shared fixtures for the integration tests.
//!
//! Builds the module used across the suites: a root graph with a splash
//! entry, auth-flow screens, a videos screen and a notification modal, a
//! `news` graph, a `home` alias pointing at it, and an intercepted
//! `workspace` graph.

#![allow(dead_code)]

use navigator_core::*;

/// The root graph most tests navigate.
pub fn module_graph() -> Graph {
    Graph::builder("root")
        .entry(Destination::screen("splash"))
        .destination(Destination::screen("login"))
        .destination(Destination::screen("check-email"))
        .destination(Destination::screen("register"))
        .destination(Destination::screen("videos"))
        .destination(
            Destination::screen("profile")
                .transitions(Transition::slide_right(300), Transition::slide_left(300)),
        )
        .destination(Destination::modal("notification").elevation(1.0))
        .destination(Destination::modal("sheet").elevation(2.0))
        .graph(
            Graph::builder("news")
                .entry(Destination::screen("overview"))
                .destination(Destination::screen("article/{articleId}"))
                .build(),
        )
        .graph(Graph::builder("home").entry_graph("news").build())
        .build()
}

/// `module_graph` plus an intercepted `workspace` graph.
pub fn module_graph_with_workspace<G: NavigationGuard>(guard: G) -> Graph {
    Graph::builder("root")
        .entry(Destination::screen("splash"))
        .destination(Destination::screen("login"))
        .destination(Destination::screen("check-email"))
        .destination(Destination::screen("register"))
        .graph(
            Graph::builder("workspace")
                .entry(Destination::screen("home").requires_auth())
                .destination(Destination::screen("invite/{token}").requires_auth())
                .intercept(guard)
                .build(),
        )
        .build()
}

/// Engine over [`module_graph`] with no extras.
pub fn engine() -> std::sync::Arc<NavigationEngine> {
    NavigationEngine::builder(module_graph()).build().unwrap()
}

/// Collects the routes listeners observed, for commit-order assertions.
pub struct RouteLog {
    seen: std::sync::Arc<std::sync::Mutex<Vec<String>>>,
}

impl RouteLog {
    pub fn attach(engine: &NavigationEngine) -> Self {
        let seen = std::sync::Arc::new(std::sync::Mutex::new(Vec::new()));
        let sink = seen.clone();
        engine.subscribe(move |event, _state| {
            sink.lock().unwrap().push(event.to.clone());
        });
        Self { seen }
    }

    pub fn routes(&self) -> Vec<String> {
        self.seen.lock().unwrap().clone()
    }

    pub fn len(&self) -> usize {
        self.seen.lock().unwrap().len()
    }
}
