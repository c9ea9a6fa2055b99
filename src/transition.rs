//! Transition references and z-ordering decisions.
//!
//! The engine never animates anything itself — it only decides *whether* a
//! route change should animate and *with which spec*, and exposes that
//! decision to the rendering layer. This module holds the vocabulary for
//! those decisions:
//!
//! - [`Transition`] — the enter/exit animation reference attached to a
//!   destination (`None`, `Fade`, `Slide`).
//! - [`TransitionState`] — the per-state flag (`Idle`/`Animating`) that the
//!   spam middleware uses for admission control.
//! - [`should_exit_be_on_top`] and [`z_index`] — the derived z-ordering
//!   policy.

use std::time::Duration;

/// Direction for slide transitions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlideDirection {
    /// Slide in from the left edge
    Left,
    /// Slide in from the right edge
    Right,
    /// Slide in from the top edge
    Up,
    /// Slide in from the bottom edge
    Down,
}

/// Built-in transition references
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Transition {
    /// No transition animation
    #[default]
    None,

    /// Fade transition (opacity animation)
    Fade {
        /// Duration in milliseconds
        duration_ms: u64,
    },

    /// Slide transition
    Slide {
        /// Direction to slide
        direction: SlideDirection,
        /// Duration in milliseconds
        duration_ms: u64,
    },
}

impl Transition {
    /// Create a fade transition
    pub fn fade(duration_ms: u64) -> Self {
        Self::Fade { duration_ms }
    }

    /// Create a slide-in-from-left transition
    pub fn slide_left(duration_ms: u64) -> Self {
        Self::Slide {
            direction: SlideDirection::Left,
            duration_ms,
        }
    }

    /// Create a slide-in-from-right transition
    pub fn slide_right(duration_ms: u64) -> Self {
        Self::Slide {
            direction: SlideDirection::Right,
            duration_ms,
        }
    }

    /// Create a slide-in-from-top transition
    pub fn slide_up(duration_ms: u64) -> Self {
        Self::Slide {
            direction: SlideDirection::Up,
            duration_ms,
        }
    }

    /// Create a slide-in-from-bottom transition
    pub fn slide_down(duration_ms: u64) -> Self {
        Self::Slide {
            direction: SlideDirection::Down,
            duration_ms,
        }
    }

    /// Get the duration of this transition
    pub fn duration(&self) -> Duration {
        match self {
            Self::None => Duration::ZERO,
            Self::Fade { duration_ms } | Self::Slide { duration_ms, .. } => {
                Duration::from_millis(*duration_ms)
            }
        }
    }

    /// Check if this is a no-op transition
    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }
}

// ============================================================================
// Transition state
// ============================================================================

/// The per-state animation flag.
///
/// A committed route change with a non-trivial transition moves the state to
/// [`Animating`](Self::Animating); the flag returns to [`Idle`](Self::Idle)
/// when the host reports the animation finished or the safety timer trips.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TransitionState {
    /// No animation in flight
    #[default]
    Idle,
    /// A route change is currently animating
    Animating,
}

impl TransitionState {
    /// Check if an animation is in flight.
    pub fn is_animating(&self) -> bool {
        matches!(self, Self::Animating)
    }
}

// ============================================================================
// Z-ordering policy
// ============================================================================

/// Base z-index for content-layer destinations (content occupies 2–3).
pub const CONTENT_Z_BASE: f32 = 2.0;

/// Base z-index for global-overlay destinations (modals).
pub const GLOBAL_OVERLAY_Z_BASE: f32 = 2000.0;

/// Base z-index reserved for host system surfaces (toasts, IME, debug HUD).
pub const SYSTEM_Z_BASE: f32 = 9001.0;

/// Decide whether the exiting entry should render above the entering one.
///
/// Derived purely from the transition pair: an entry that enters with no
/// animation while the old one animates out must sit *below* the outgoing
/// entry for the exit to be visible.
pub fn should_exit_be_on_top(enter: Transition, exit: Transition) -> bool {
    enter.is_none() && !exit.is_none()
}

/// Compute the z-index for a destination layer and elevation.
///
/// Content stays within its 2–3 band regardless of elevation; overlays sort
/// ascending by elevation above [`GLOBAL_OVERLAY_Z_BASE`].
pub fn z_index(layer: crate::destination::Layer, elevation: f32) -> f32 {
    match layer {
        crate::destination::Layer::Content => CONTENT_Z_BASE + elevation.clamp(0.0, 1.0),
        crate::destination::Layer::GlobalOverlay => GLOBAL_OVERLAY_Z_BASE + elevation.max(0.0),
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::destination::Layer;

    #[test]
    fn test_transition_none() {
        let transition = Transition::None;
        assert!(transition.is_none());
        assert_eq!(transition.duration(), Duration::ZERO);
    }

    #[test]
    fn test_transition_fade() {
        let transition = Transition::fade(200);
        assert!(!transition.is_none());
        assert_eq!(transition.duration(), Duration::from_millis(200));
    }

    #[test]
    fn test_transition_slide() {
        let transition = Transition::slide_right(300);
        assert_eq!(transition.duration(), Duration::from_millis(300));

        if let Transition::Slide { direction, .. } = transition {
            assert_eq!(direction, SlideDirection::Right);
        } else {
            panic!("Expected Slide transition");
        }
    }

    #[test]
    fn test_transition_state_flag() {
        assert!(!TransitionState::Idle.is_animating());
        assert!(TransitionState::Animating.is_animating());
        assert_eq!(TransitionState::default(), TransitionState::Idle);
    }

    #[test]
    fn test_exit_on_top_policy() {
        // Silent enter + animated exit: outgoing entry stays visible on top.
        assert!(should_exit_be_on_top(
            Transition::None,
            Transition::slide_left(300)
        ));
        // Animated enter wins the top slot.
        assert!(!should_exit_be_on_top(
            Transition::slide_right(300),
            Transition::slide_left(300)
        ));
        assert!(!should_exit_be_on_top(Transition::None, Transition::None));
    }

    #[test]
    fn test_z_index_bands() {
        assert_eq!(z_index(Layer::Content, 0.0), 2.0);
        assert_eq!(z_index(Layer::Content, 5.0), 3.0); // clamped to the band
        assert_eq!(z_index(Layer::GlobalOverlay, 0.0), 2000.0);
        assert!(z_index(Layer::GlobalOverlay, 10.0) > z_index(Layer::GlobalOverlay, 1.0));
        assert!(SYSTEM_Z_BASE > GLOBAL_OVERLAY_Z_BASE);
    }
}
