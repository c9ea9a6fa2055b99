//! End-to-end stack semantics: pushes, pops, replacement, clearing, modal
//! contexts, deep links, and transition decisions.

mod common;

use common::{engine, module_graph, RouteLog};
use navigator_core::*;
use std::sync::{Arc, Mutex};

// ---- transitions and events ----

#[tokio::test]
async fn test_navigate_reports_transition_decision() {
    let engine = engine();
    let events: Arc<Mutex<Vec<NavigationEvent>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = events.clone();
    engine.subscribe(move |event, _| sink.lock().unwrap().push(event.clone()));

    let outcome = engine
        .navigate(|tx| tx.navigate_to("profile", Params::new()))
        .await
        .unwrap();
    assert!(outcome.is_success());

    let events = events.lock().unwrap();
    assert_eq!(events.len(), 1);
    let event = &events[0];
    assert_eq!(event.from.as_deref(), Some("splash"));
    assert_eq!(event.to, "profile");
    assert_eq!(event.direction, NavigationDirection::Forward);
    assert_eq!(event.enter, Transition::slide_right(300));
    // The splash screen declares no exit animation.
    assert_eq!(event.exit, Transition::None);
    assert!(!event.exit_on_top);

    // An animated route change flips the admission flag.
    assert!(engine.state().transition_state().is_animating());
}

#[tokio::test]
async fn test_navigation_without_transitions_stays_idle() {
    let engine = engine();
    engine
        .navigate(|tx| tx.navigate_to("videos", Params::new()))
        .await
        .unwrap();
    assert!(!engine.state().transition_state().is_animating());
}

// ---- graph aliases ----

#[tokio::test]
async fn test_alias_chain_resolves_to_terminal_graph() {
    let engine = engine();
    let outcome = engine
        .navigate(|tx| tx.navigate_to("home", Params::new()))
        .await
        .unwrap();
    assert!(outcome.is_success());

    let state = engine.state();
    assert_eq!(state.current().route(), "overview");
    assert_eq!(state.current().graph_id().as_str(), "news");

    let routes: Vec<&str> = state.back_stack().iter().map(|e| e.route()).collect();
    assert_eq!(routes, vec!["splash", "overview"]);
}

// ---- pop_up_to ----

#[tokio::test]
async fn test_pop_up_to_newest_match_wins() {
    let engine = engine();
    for route in ["videos", "profile", "register", "profile", "login"] {
        engine
            .navigate(|tx| tx.navigate_to(route, Params::new()))
            .await
            .unwrap();
    }
    assert_eq!(engine.state().depth(), 6);

    engine
        .navigate(|tx| tx.pop_up_to("profile", false))
        .await
        .unwrap();

    let state = engine.state();
    let routes: Vec<&str> = state
        .back_stack()
        .iter()
        .map(|e| e.route())
        .collect();
    // The newest "profile" (position 4) became the top.
    assert_eq!(routes, vec!["splash", "videos", "profile", "register", "profile"]);
}

#[tokio::test]
async fn test_pop_up_to_inclusive_with_push() {
    let engine = engine();
    for route in ["videos", "profile"] {
        engine
            .navigate(|tx| tx.navigate_to(route, Params::new()))
            .await
            .unwrap();
    }

    engine
        .navigate(|tx| {
            tx.pop_up_to("videos", true)
                .navigate_to("register", Params::new())
        })
        .await
        .unwrap();

    let state = engine.state();
    let routes: Vec<&str> = state
        .back_stack()
        .iter()
        .map(|e| e.route())
        .collect();
    assert_eq!(routes, vec!["splash", "register"]);
}

#[tokio::test]
async fn test_pop_up_to_graph_qualified_route() {
    let engine = engine();
    engine
        .navigate(|tx| tx.navigate_to("news/article/9", Params::new()))
        .await
        .unwrap();
    engine
        .navigate(|tx| tx.navigate_to("videos", Params::new()))
        .await
        .unwrap();

    engine
        .navigate(|tx| tx.pop_up_to("news/article/{articleId}", false))
        .await
        .unwrap();
    assert_eq!(engine.state().current().route(), "article/{articleId}");
    assert_eq!(engine.state().current().graph_id().as_str(), "news");
}

#[tokio::test]
async fn test_pop_up_to_unknown_fails_without_mutation() {
    let engine = engine();
    engine
        .navigate(|tx| tx.navigate_to("videos", Params::new()))
        .await
        .unwrap();
    let before = engine.state().depth();

    let err = engine
        .navigate(|tx| tx.pop_up_to("ghost", false))
        .await
        .unwrap_err();
    assert!(err.is_route_not_found());
    assert_eq!(engine.state().depth(), before);
}

// ---- clear / replace ----

#[tokio::test]
async fn test_clear_back_stack_requires_single_push() {
    let engine = engine();
    engine
        .navigate(|tx| tx.navigate_to("videos", Params::new()))
        .await
        .unwrap();

    engine
        .navigate(|tx| {
            tx.clear_back_stack()
                .navigate_to("login", Params::new())
        })
        .await
        .unwrap();

    let state = engine.state();
    assert_eq!(state.depth(), 1);
    assert_eq!(state.current().route(), "login");

    let err = engine
        .navigate(|tx| tx.clear_back_stack())
        .await
        .unwrap_err();
    assert!(err.is_invalid_configuration());
}

#[tokio::test]
async fn test_replace_current_swaps_top() {
    let engine = engine();
    engine
        .navigate(|tx| tx.navigate_to("videos", Params::new()))
        .await
        .unwrap();
    engine
        .navigate(|tx| tx.navigate_to("register", Params::new()).replace_current())
        .await
        .unwrap();

    let state = engine.state();
    let routes: Vec<&str> = state
        .back_stack()
        .iter()
        .map(|e| e.route())
        .collect();
    assert_eq!(routes, vec!["splash", "register"]);
}

// ---- params ----

#[tokio::test]
async fn test_param_merge_priority() {
    let engine = engine();

    // Path params lose to explicit caller params on collision.
    engine
        .navigate(|tx| {
            tx.navigate_to(
                "news/article/42",
                Params::from_pairs([("articleId", "override"), ("extra", "1")]),
            )
        })
        .await
        .unwrap();

    let state = engine.state();
    assert_eq!(
        state.current().params().get_str("articleId"),
        Some("override")
    );
    assert_eq!(state.current().params().get_str("extra"), Some("1"));
}

#[tokio::test]
async fn test_forward_params_inherits_lowest_priority() {
    let engine = engine();
    engine
        .navigate(|tx| {
            tx.navigate_to(
                "videos",
                Params::from_pairs([("session", "abc"), ("view", "grid")]),
            )
        })
        .await
        .unwrap();

    engine
        .navigate(|tx| {
            tx.navigate_to("profile", Params::from_pairs([("view", "list")]))
                .forward_params()
        })
        .await
        .unwrap();

    let params = engine.state().current().params().clone();
    assert_eq!(params.get_str("session"), Some("abc")); // inherited
    assert_eq!(params.get_str("view"), Some("list")); // explicit wins
}

// ---- modals ----

#[tokio::test]
async fn test_modal_restoration_after_screen_navigation() {
    let engine = engine();
    engine
        .navigate(|tx| tx.navigate_to("notification", Params::new()))
        .await
        .unwrap();
    assert!(engine.state().is_current_modal());

    // A screen over the modal closes it but keeps its context.
    engine
        .navigate(|tx| tx.navigate_to("videos", Params::new()))
        .await
        .unwrap();
    let state = engine.state();
    assert!(!state.is_current_modal());
    assert_eq!(state.current().route(), "videos");
    assert_eq!(state.modal_contexts().len(), 1);
    assert!(state.modal_contexts()[0].is_pending_restoration());

    // Back from that screen restores the modal over its original screen.
    engine.navigate_back().await.unwrap();
    let state = engine.state();
    assert_eq!(state.current().route(), "notification");
    assert!(state.is_current_modal());

    let underlying = state.modal_contexts()[0].underlying();
    let beneath = state
        .back_stack()
        .iter()
        .find(|e| e.id() == underlying)
        .unwrap();
    assert_eq!(beneath.route(), "splash");
}

#[tokio::test]
async fn test_dismiss_modals_forgets_contexts() {
    let engine = engine();
    engine
        .navigate(|tx| tx.navigate_to("notification", Params::new()))
        .await
        .unwrap();

    engine
        .navigate(|tx| {
            tx.navigate_to("videos", Params::new()).dismiss_modals()
        })
        .await
        .unwrap();
    assert!(engine.state().modal_contexts().is_empty());

    engine.navigate_back().await.unwrap();
    let state = engine.state();
    assert_eq!(state.current().route(), "splash");
    assert!(!state.is_current_modal());
    assert!(state.modal_contexts().is_empty());
}

#[tokio::test]
async fn test_stacked_modals_share_underlying_screen() {
    let engine = engine();
    engine
        .navigate(|tx| tx.navigate_to("notification", Params::new()))
        .await
        .unwrap();
    engine
        .navigate(|tx| tx.navigate_to("sheet", Params::new()))
        .await
        .unwrap();

    let state = engine.state();
    assert_eq!(state.depth(), 3);
    assert_eq!(state.modal_contexts().len(), 2);

    // Both modals point at the screen beneath the pile, and the contexts
    // are ordered ascending by elevation.
    let underlying: Vec<_> = state
        .modal_contexts()
        .iter()
        .map(ModalContext::underlying)
        .collect();
    assert_eq!(underlying[0], underlying[1]);
    assert!(
        state.modal_contexts()[0].modal().destination().elevation_value()
            <= state.modal_contexts()[1].modal().destination().elevation_value()
    );

    // Popping the top modal drops only its own context.
    engine.navigate_back().await.unwrap();
    let state = engine.state();
    assert_eq!(state.current().route(), "notification");
    assert_eq!(state.modal_contexts().len(), 1);
}

// ---- deep links ----

#[tokio::test]
async fn test_deep_link_synthesizes_graph_entry() {
    let engine = engine();
    let log = RouteLog::attach(&engine);

    engine.navigate_deep_link("news/article/42?ref=push").await.unwrap();

    let state = engine.state();
    let routes: Vec<&str> = state.back_stack().iter().map(|e| e.route()).collect();
    assert_eq!(routes, vec!["splash", "overview", "article/{articleId}"]);
    assert_eq!(state.current().params().get_str("articleId"), Some("42"));
    assert_eq!(state.current().params().get_str("ref"), Some("push"));
    assert_eq!(state.current_full_path(), "news/article/42");

    // One transaction, one observable commit.
    assert_eq!(log.len(), 1);
}

#[tokio::test]
async fn test_deep_link_alias_rewrite() {
    let engine = NavigationEngine::builder(module_graph())
        .deep_link(DeepLinkAlias::new("breaking/{articleId}", "news/article/{articleId}"))
        .build()
        .unwrap();

    engine.navigate_deep_link("breaking/7").await.unwrap();
    let state = engine.state();
    assert_eq!(state.current().route(), "article/{articleId}");
    assert_eq!(state.current().params().get_str("articleId"), Some("7"));
}

// ---- observability ----

#[tokio::test]
async fn test_observable_fields() {
    let engine = engine();
    engine
        .navigate(|tx| tx.navigate_to("news/article/42", Params::new()))
        .await
        .unwrap();

    let state = engine.state();
    assert_eq!(state.navigation_depth(), 2);
    assert_eq!(state.current_full_path(), "news/article/42");
    assert_eq!(state.current_path_segments(), vec!["news", "article", "42"]);
    assert_eq!(state.current().position(), 1);
    assert!(state.guided_flow_state().is_none());
    assert!(state.pending_navigation().is_none());
}
