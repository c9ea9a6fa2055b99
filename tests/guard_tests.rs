//! Guard interception, pending navigation, the single-writer drop rule, the
//! loading-modal threshold, and the transition safety timer.

mod common;

use common::{module_graph_with_workspace, RouteLog};
use navigator_core::*;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Guard redirecting unauthenticated users to login, pending the original
/// target.
fn auth_guard(authed: Arc<AtomicBool>) -> impl NavigationGuard {
    guard_fn(move |_request| {
        if authed.load(Ordering::SeqCst) {
            GuardOutcome::Allow
        } else {
            GuardOutcome::pend_and_redirect("login", Params::new()).display_hint("Sign in")
        }
    })
}

#[tokio::test]
async fn test_pend_and_redirect_stores_pending_navigation() {
    let authed = Arc::new(AtomicBool::new(false));
    let engine = NavigationEngine::builder(module_graph_with_workspace(auth_guard(authed.clone())))
        .build()
        .unwrap();

    let outcome = engine
        .navigate(|tx| tx.navigate_to("workspace/home", Params::new()))
        .await
        .unwrap();
    assert_eq!(outcome.redirect_route(), Some("login"));

    let state = engine.state();
    assert_eq!(state.current().route(), "login");
    let pending = state.pending_navigation().unwrap();
    assert_eq!(pending.route, "workspace/home");
    assert_eq!(pending.display_hint.as_deref(), Some("Sign in"));

    // Pending survives intermediate navigations.
    engine
        .navigate(|tx| tx.navigate_to("check-email", Params::new()))
        .await
        .unwrap();
    engine
        .navigate(|tx| tx.navigate_to("register", Params::new()))
        .await
        .unwrap();
    assert!(engine.state().pending_navigation().is_some());

    // Log in and resume: the original target commits, pending clears.
    authed.store(true, Ordering::SeqCst);
    let outcome = engine.resume_pending_navigation().await.unwrap();
    assert!(outcome.is_success());

    let state = engine.state();
    assert_eq!(state.current().route(), "home");
    assert_eq!(state.current_full_path(), "workspace/home");
    assert!(state.pending_navigation().is_none());
}

#[tokio::test]
async fn test_pending_deep_link_preserves_params() {
    let authed = Arc::new(AtomicBool::new(false));
    let engine = NavigationEngine::builder(module_graph_with_workspace(auth_guard(authed.clone())))
        .deep_link(DeepLinkAlias::new("artist/invite", "workspace/invite/{token}"))
        .build()
        .unwrap();

    engine
        .navigate_deep_link("artist/invite?token=XYZ789")
        .await
        .unwrap();

    let state = engine.state();
    assert_eq!(state.current().route(), "login");
    let pending = state.pending_navigation().unwrap();
    assert_eq!(pending.route, "workspace/invite/{token}");
    assert_eq!(pending.params.get_str("token"), Some("XYZ789"));

    authed.store(true, Ordering::SeqCst);
    engine.resume_pending_navigation().await.unwrap();

    let state = engine.state();
    assert_eq!(state.current().route(), "invite/{token}");
    assert_eq!(state.current().params().get_str("token"), Some("XYZ789"));
    assert_eq!(state.current_full_path(), "workspace/invite/XYZ789");
    assert!(state.pending_navigation().is_none());
}

#[tokio::test]
async fn test_clear_pending_navigation() {
    let authed = Arc::new(AtomicBool::new(false));
    let engine = NavigationEngine::builder(module_graph_with_workspace(auth_guard(authed)))
        .build()
        .unwrap();

    engine
        .navigate(|tx| tx.navigate_to("workspace/home", Params::new()))
        .await
        .unwrap();
    assert!(engine.state().pending_navigation().is_some());

    engine
        .navigate(|tx| tx.clear_pending_navigation())
        .await
        .unwrap();
    assert!(engine.state().pending_navigation().is_none());
}

#[tokio::test]
async fn test_reject_leaves_state_unchanged() {
    let engine = NavigationEngine::builder(module_graph_with_workspace(guard_fn(|_| {
        GuardOutcome::Reject
    })))
    .build()
    .unwrap();

    let outcome = engine
        .navigate(|tx| tx.navigate_to("workspace/home", Params::new()))
        .await
        .unwrap();
    assert!(outcome.is_rejected());

    let state = engine.state();
    assert_eq!(state.current().route(), "splash");
    assert_eq!(state.depth(), 1);
    assert!(state.pending_navigation().is_none());
}

#[tokio::test]
async fn test_plain_redirect_does_not_pend() {
    let engine = NavigationEngine::builder(module_graph_with_workspace(guard_fn(|_| {
        GuardOutcome::redirect("register")
    })))
    .build()
    .unwrap();

    let outcome = engine
        .navigate(|tx| tx.navigate_to("workspace/home", Params::new()))
        .await
        .unwrap();
    assert_eq!(outcome.redirect_route(), Some("register"));
    assert_eq!(engine.state().current().route(), "register");
    assert!(engine.state().pending_navigation().is_none());
}

#[tokio::test]
async fn test_guard_only_intercepts_its_subtree() {
    let engine = NavigationEngine::builder(module_graph_with_workspace(guard_fn(|_| {
        GuardOutcome::Reject
    })))
    .build()
    .unwrap();

    // Destinations outside the intercepted graph pass untouched.
    let outcome = engine
        .navigate(|tx| tx.navigate_to("register", Params::new()))
        .await
        .unwrap();
    assert!(outcome.is_success());
}

// ---- single-writer concurrency ----

#[tokio::test]
async fn test_second_navigation_drops_while_guard_suspended() {
    let engine = NavigationEngine::builder(module_graph_with_workspace(async_guard_fn(
        |_request| {
            Box::pin(async {
                tokio::time::sleep(Duration::from_millis(50)).await;
                GuardOutcome::Allow
            })
        },
    )))
    .build()
    .unwrap();

    let slow = {
        let engine = engine.clone();
        tokio::spawn(async move {
            engine
                .navigate(|tx| tx.navigate_to("workspace/home", Params::new()))
                .await
                .unwrap()
        })
    };

    // Give the slow navigation time to take the writer and suspend.
    tokio::time::sleep(Duration::from_millis(10)).await;
    let fast = engine
        .navigate(|tx| tx.navigate_to("register", Params::new()))
        .await
        .unwrap();
    assert!(fast.is_dropped());

    let slow = slow.await.unwrap();
    assert!(slow.is_success());
    assert_eq!(engine.state().current().route(), "home");
}

// ---- loading modal ----

#[tokio::test]
async fn test_slow_guard_shows_and_clears_loading_modal() {
    let loading = Destination::modal("loading");
    let loading_id = loading.id();

    let root = Graph::builder("root")
        .entry(Destination::screen("splash"))
        .destination(loading)
        .graph(
            Graph::builder("workspace")
                .entry(Destination::screen("home"))
                .intercept(async_guard_fn(|_request| {
                    Box::pin(async {
                        tokio::time::sleep(Duration::from_millis(60)).await;
                        GuardOutcome::Allow
                    })
                }))
                .build(),
        )
        .build();

    let engine = NavigationEngine::builder(root)
        .config(
            EngineConfig::new()
                .guard_threshold(Duration::from_millis(10))
                .loading_modal(loading_id),
        )
        .build()
        .unwrap();
    let log = RouteLog::attach(&engine);

    let outcome = engine
        .navigate(|tx| tx.navigate_to("workspace/home", Params::new()))
        .await
        .unwrap();
    assert!(outcome.is_success());

    // The interim commit showed the loading modal; the final commit
    // replaced it with the real target.
    assert_eq!(log.routes(), vec!["loading", "workspace/home"]);

    let state = engine.state();
    assert_eq!(state.current().route(), "home");
    assert!(state.back_stack().iter().all(|e| e.route() != "loading"));
    assert!(state.modal_contexts().is_empty());
}

#[tokio::test]
async fn test_fast_guard_skips_loading_modal() {
    let loading = Destination::modal("loading");
    let loading_id = loading.id();

    let root = Graph::builder("root")
        .entry(Destination::screen("splash"))
        .destination(loading)
        .graph(
            Graph::builder("workspace")
                .entry(Destination::screen("home"))
                .intercept(guard_fn(|_| GuardOutcome::Allow))
                .build(),
        )
        .build();

    let engine = NavigationEngine::builder(root)
        .config(
            EngineConfig::new()
                .guard_threshold(Duration::from_millis(150))
                .loading_modal(loading_id),
        )
        .build()
        .unwrap();
    let log = RouteLog::attach(&engine);

    engine
        .navigate(|tx| tx.navigate_to("workspace/home", Params::new()))
        .await
        .unwrap();

    // No interim commit for a guard faster than the threshold.
    assert_eq!(log.routes(), vec!["workspace/home"]);
}

// ---- safety timer ----

#[tokio::test(start_paused = true)]
async fn test_safety_timeout_resets_transition_state() {
    let root = Graph::builder("root")
        .entry(Destination::screen("splash"))
        .destination(
            Destination::screen("profile")
                .transitions(Transition::slide_right(100), Transition::None),
        )
        .build();

    let engine = NavigationEngine::builder(root)
        .config(EngineConfig::new().safety_timeout(Duration::from_millis(500)))
        .build()
        .unwrap();

    engine
        .navigate(|tx| tx.navigate_to("profile", Params::new()))
        .await
        .unwrap();
    assert!(engine.state().transition_state().is_animating());

    // Host never reports the animation end: the flag self-heals after
    // duration + safety timeout.
    tokio::time::sleep(Duration::from_millis(700)).await;
    assert!(!engine.state().transition_state().is_animating());
}

#[tokio::test(start_paused = true)]
async fn test_host_reported_idle_cancels_safety_timer() {
    let root = Graph::builder("root")
        .entry(Destination::screen("splash"))
        .destination(
            Destination::screen("profile")
                .transitions(Transition::slide_right(100), Transition::None),
        )
        .build();

    let engine = NavigationEngine::builder(root).build().unwrap();
    engine
        .navigate(|tx| tx.navigate_to("profile", Params::new()))
        .await
        .unwrap();

    engine
        .dispatch(NavigationIntent::UpdateTransitionState {
            state: TransitionState::Idle,
        })
        .await
        .unwrap();
    assert!(!engine.state().transition_state().is_animating());

    tokio::time::sleep(Duration::from_secs(5)).await;
    assert!(!engine.state().transition_state().is_animating());
}
