//! Effect engine - composes the active effects over each incoming frame
//!
//! The engine is a pure composition host: it never constructs effects
//! itself. Instances are bound with [`EffectEngine::load_effect`], and the
//! ordered active list decides which of them run on the next call to
//! [`EffectEngine::process`].

use std::collections::{HashMap, VecDeque};

use super::traits::{Effect, EffectCapabilities, EffectError, EffectInput, FocalPoint};
use crate::frame::Frame;

/// Number of input frames retained for temporal effects
pub const DEFAULT_HISTORY_CAPACITY: usize = 2;

/// An effect instance together with its capabilities, resolved at load time
struct LoadedEffect {
    effect: Box<dyn Effect>,
    capabilities: EffectCapabilities,
}

/// Sequential effect compositor with a bounded frame history
pub struct EffectEngine {
    /// Effect identifiers to run, in composition order
    active: Vec<String>,
    /// Bound effect instances by identifier
    effects: HashMap<String, LoadedEffect>,
    /// Most recent input frames, oldest first
    history: VecDeque<Frame>,
    history_capacity: usize,
}

impl Default for EffectEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl EffectEngine {
    /// Create an engine with the default history capacity
    pub fn new() -> Self {
        Self::with_history_capacity(DEFAULT_HISTORY_CAPACITY)
    }

    /// Create an engine retaining up to `capacity` frames (at least one)
    pub fn with_history_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            active: Vec::new(),
            effects: HashMap::new(),
            history: VecDeque::with_capacity(capacity + 1),
            history_capacity: capacity,
        }
    }

    // ========== Effect Instances ==========

    /// Bind an effect identifier to a concrete instance
    ///
    /// Replaces any instance previously bound to the same identifier.
    pub fn load_effect(&mut self, effect_id: &str, effect: Box<dyn Effect>) {
        let capabilities = effect.capabilities();
        tracing::debug!(
            effect = effect_id,
            needs_previous_frame = capabilities.needs_previous_frame,
            needs_focal_point = capabilities.needs_focal_point,
            "Loaded effect"
        );
        self.effects.insert(
            effect_id.to_string(),
            LoadedEffect {
                effect,
                capabilities,
            },
        );
    }

    /// Remove the instance bound to an identifier
    pub fn unload_effect(&mut self, effect_id: &str) -> bool {
        self.effects.remove(effect_id).is_some()
    }

    /// Check if an identifier has a bound instance
    pub fn is_loaded(&self, effect_id: &str) -> bool {
        self.effects.contains_key(effect_id)
    }

    /// Capabilities of a bound effect
    pub fn capabilities(&self, effect_id: &str) -> Option<EffectCapabilities> {
        self.effects.get(effect_id).map(|e| e.capabilities)
    }

    // ========== Active List ==========

    /// Append an effect to the active list (no-op if already active)
    pub fn activate(&mut self, effect_id: &str) {
        if !self.is_active(effect_id) {
            self.active.push(effect_id.to_string());
        }
    }

    /// Remove an effect from the active list (no-op if absent)
    pub fn deactivate(&mut self, effect_id: &str) {
        self.active.retain(|id| id != effect_id);
    }

    /// Flip an effect's membership; returns whether it is now active
    pub fn toggle(&mut self, effect_id: &str) -> bool {
        if self.is_active(effect_id) {
            self.deactivate(effect_id);
            false
        } else {
            self.activate(effect_id);
            true
        }
    }

    /// Replace the active list, dropping duplicates after their first occurrence
    pub fn set_active<I, S>(&mut self, effect_ids: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.active.clear();
        for id in effect_ids {
            self.activate(id.as_ref());
        }
    }

    /// Empty the active list
    ///
    /// Frame history and effect internal state are left untouched.
    pub fn clear(&mut self) {
        self.active.clear();
    }

    pub fn is_active(&self, effect_id: &str) -> bool {
        self.active.iter().any(|id| id == effect_id)
    }

    /// Active identifiers in composition order
    pub fn active_effects(&self) -> &[String] {
        &self.active
    }

    // ========== History ==========

    pub fn history_capacity(&self) -> usize {
        self.history_capacity
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    // ========== Processing ==========

    /// Compose every active effect over `frame`
    ///
    /// Each effect receives the previous effect's output. An effect that
    /// fails, or returns a frame of a different size, is skipped and the
    /// frame continues unchanged to the next one.
    pub fn process(&mut self, frame: &Frame) -> Frame {
        self.history.push_back(frame.clone());
        while self.history.len() > self.history_capacity {
            self.history.pop_front();
        }

        let previous = if self.history.len() > 1 {
            self.history.front()
        } else {
            None
        };
        let center = FocalPoint::center_of(frame);
        let mut current = frame.clone();

        for effect_id in &self.active {
            let Some(loaded) = self.effects.get_mut(effect_id) else {
                tracing::trace!(effect = %effect_id, "Active effect has no bound instance");
                continue;
            };

            let input = EffectInput {
                focal_point: loaded.capabilities.needs_focal_point.then_some(center),
                previous_frame: if loaded.capabilities.needs_previous_frame {
                    previous
                } else {
                    None
                },
            };

            let result = loaded.effect.apply(&current, &input).and_then(|output| {
                if output.dimensions() == current.dimensions() {
                    Ok(output)
                } else {
                    Err(EffectError::SizeChanged {
                        expected_width: current.width(),
                        expected_height: current.height(),
                        width: output.width(),
                        height: output.height(),
                    })
                }
            });

            match result {
                Ok(output) => current = output,
                Err(e) => {
                    tracing::warn!(effect = %effect_id, error = %e, "Effect failed, passing frame through");
                }
            }
        }

        current
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;
    use parking_lot::Mutex;
    use std::sync::Arc;

    // Adds a constant to every channel
    struct AddEffect(u8);

    impl Effect for AddEffect {
        fn effect_type(&self) -> &'static str {
            "add"
        }

        fn apply(&mut self, frame: &Frame, _input: &EffectInput<'_>) -> Result<Frame, EffectError> {
            let mut out = frame.clone();
            for p in out.pixels_mut() {
                for c in 0..3 {
                    p.0[c] = p.0[c].saturating_add(self.0);
                }
            }
            Ok(out)
        }
    }

    // Doubles every channel
    struct DoubleEffect;

    impl Effect for DoubleEffect {
        fn effect_type(&self) -> &'static str {
            "double"
        }

        fn apply(&mut self, frame: &Frame, _input: &EffectInput<'_>) -> Result<Frame, EffectError> {
            let mut out = frame.clone();
            for p in out.pixels_mut() {
                for c in 0..3 {
                    p.0[c] = p.0[c].saturating_mul(2);
                }
            }
            Ok(out)
        }
    }

    struct FailingEffect;

    impl Effect for FailingEffect {
        fn effect_type(&self) -> &'static str {
            "failing"
        }

        fn apply(&mut self, _frame: &Frame, _input: &EffectInput<'_>) -> Result<Frame, EffectError> {
            Err(EffectError::Failed("boom".into()))
        }
    }

    struct ShrinkEffect;

    impl Effect for ShrinkEffect {
        fn effect_type(&self) -> &'static str {
            "shrink"
        }

        fn apply(&mut self, _frame: &Frame, _input: &EffectInput<'_>) -> Result<Frame, EffectError> {
            Ok(Frame::new(1, 1))
        }
    }

    // Records the auxiliary arguments it receives
    #[derive(Default, Clone)]
    struct Seen {
        previous: Arc<Mutex<Vec<Option<Frame>>>>,
        focal: Arc<Mutex<Vec<Option<FocalPoint>>>>,
    }

    struct RecordingEffect {
        capabilities: EffectCapabilities,
        seen: Seen,
    }

    impl Effect for RecordingEffect {
        fn effect_type(&self) -> &'static str {
            "recording"
        }

        fn capabilities(&self) -> EffectCapabilities {
            self.capabilities
        }

        fn apply(&mut self, frame: &Frame, input: &EffectInput<'_>) -> Result<Frame, EffectError> {
            self.seen.previous.lock().push(input.previous_frame.cloned());
            self.seen.focal.lock().push(input.focal_point);
            Ok(frame.clone())
        }
    }

    fn solid(v: u8) -> Frame {
        Frame::from_pixel(4, 3, Rgb([v, v, v]))
    }

    #[test]
    fn test_empty_active_list_is_identity() {
        let mut engine = EffectEngine::new();
        engine.load_effect("add", Box::new(AddEffect(10)));
        let frame = Frame::from_fn(5, 5, |x, y| Rgb([x as u8, y as u8, 3]));
        assert_eq!(engine.process(&frame), frame);
    }

    #[test]
    fn test_activate_then_deactivate_is_identity() {
        let mut engine = EffectEngine::new();
        engine.load_effect("add", Box::new(AddEffect(10)));
        engine.activate("add");
        engine.deactivate("add");
        let frame = solid(50);
        assert_eq!(engine.process(&frame), frame);
    }

    #[test]
    fn test_membership_edits_are_idempotent() {
        let mut engine = EffectEngine::new();
        engine.activate("a");
        engine.activate("a");
        engine.activate("b");
        assert_eq!(engine.active_effects(), ["a", "b"]);

        engine.deactivate("missing");
        engine.deactivate("a");
        engine.deactivate("a");
        assert_eq!(engine.active_effects(), ["b"]);

        assert!(engine.toggle("a"));
        assert!(!engine.toggle("b"));
        assert_eq!(engine.active_effects(), ["a"]);

        engine.set_active(["c", "a", "c"]);
        assert_eq!(engine.active_effects(), ["c", "a"]);

        engine.clear();
        assert!(engine.active_effects().is_empty());
    }

    #[test]
    fn test_composition_is_sequential() {
        let mut engine = EffectEngine::new();
        engine.load_effect("add", Box::new(AddEffect(10)));
        engine.load_effect("double", Box::new(DoubleEffect));

        engine.set_active(["add", "double"]);
        assert_eq!(engine.process(&solid(5)).get_pixel(0, 0).0, [30, 30, 30]);

        engine.set_active(["double", "add"]);
        assert_eq!(engine.process(&solid(5)).get_pixel(0, 0).0, [20, 20, 20]);
    }

    #[test]
    fn test_failing_effect_passes_frame_through() {
        let mut engine = EffectEngine::new();
        engine.load_effect("add", Box::new(AddEffect(1)));
        engine.load_effect("failing", Box::new(FailingEffect));
        engine.load_effect("shrink", Box::new(ShrinkEffect));
        engine.set_active(["add", "failing", "shrink", "add"]);

        // Duplicates are dropped, so "add" runs once
        let out = engine.process(&solid(7));
        assert_eq!(out.dimensions(), (4, 3));
        assert_eq!(out.get_pixel(0, 0).0, [8, 8, 8]);
    }

    #[test]
    fn test_unbound_active_effect_is_skipped() {
        let mut engine = EffectEngine::new();
        engine.activate("ghost");
        assert_eq!(engine.process(&solid(9)), solid(9));
    }

    #[test]
    fn test_previous_frame_is_prior_input() {
        let seen = Seen::default();
        let mut engine = EffectEngine::new();
        engine.load_effect(
            "temporal",
            Box::new(RecordingEffect {
                capabilities: EffectCapabilities::PREVIOUS_FRAME,
                seen: seen.clone(),
            }),
        );
        // Output differs from input, so history must hold inputs
        engine.load_effect("add", Box::new(AddEffect(100)));
        engine.set_active(["add", "temporal"]);

        let inputs: Vec<Frame> = (0..4).map(|i| solid(i * 10)).collect();
        for frame in &inputs {
            engine.process(frame);
        }

        let previous = seen.previous.lock();
        assert_eq!(previous.len(), 4);
        assert!(previous[0].is_none());
        assert_eq!(previous[1].as_ref(), Some(&inputs[0]));
        assert_eq!(previous[3].as_ref(), Some(&inputs[2]));
        assert_eq!(engine.history_len(), DEFAULT_HISTORY_CAPACITY);
        assert!(seen.focal.lock().iter().all(Option::is_none));
    }

    #[test]
    fn test_focal_point_is_frame_center() {
        let seen = Seen::default();
        let mut engine = EffectEngine::new();
        engine.load_effect(
            "focal",
            Box::new(RecordingEffect {
                capabilities: EffectCapabilities::FOCAL_POINT,
                seen: seen.clone(),
            }),
        );
        engine.activate("focal");
        engine.process(&Frame::new(9, 4));
        engine.process(&Frame::new(9, 4));

        assert_eq!(seen.focal.lock()[0], Some(FocalPoint::new(4.0, 2.0)));
        assert!(seen.previous.lock().iter().all(Option::is_none));
    }

    #[test]
    fn test_clear_keeps_history() {
        let mut engine = EffectEngine::new();
        engine.activate("x");
        engine.process(&solid(1));
        engine.process(&solid(2));
        engine.clear();
        assert_eq!(engine.history_len(), 2);
    }

    #[test]
    fn test_capabilities_cached_at_load() {
        let mut engine = EffectEngine::with_history_capacity(0);
        assert_eq!(engine.history_capacity(), 1);
        engine.load_effect(
            "temporal",
            Box::new(RecordingEffect {
                capabilities: EffectCapabilities::PREVIOUS_FRAME,
                seen: Seen::default(),
            }),
        );
        assert_eq!(
            engine.capabilities("temporal"),
            Some(EffectCapabilities::PREVIOUS_FRAME)
        );
        assert!(engine.unload_effect("temporal"));
        assert!(!engine.is_loaded("temporal"));
    }
}
