use std::time::{Duration, Instant};

use crate::constants::TOGGLE_DEBOUNCE_MS;

/// Edge detector for a toggle key polled once per frame.
///
/// A press counts only on the released -> pressed edge, and only if the
/// previous accepted press is more than the debounce window old.
#[derive(Debug, Clone)]
pub struct ToggleKey {
    was_pressed: bool,
    last_accepted: Option<Instant>,
    debounce: Duration,
}

impl ToggleKey {
    pub fn new() -> Self {
        Self::with_debounce(Duration::from_millis(TOGGLE_DEBOUNCE_MS))
    }

    pub fn with_debounce(debounce: Duration) -> Self {
        Self {
            was_pressed: false,
            last_accepted: None,
            debounce,
        }
    }

    /// Feed the current key state, returns true when the press should toggle.
    pub fn poll(&mut self, pressed: bool, now: Instant) -> bool {
        let rising = pressed && !self.was_pressed;
        self.was_pressed = pressed;
        if !rising {
            return false;
        }

        let debounced = self
            .last_accepted
            .is_none_or(|last| now.saturating_duration_since(last) > self.debounce);
        if debounced {
            self.last_accepted = Some(now);
        }
        debounced
    }
}

impl Default for ToggleKey {
    fn default() -> Self {
        Self::new()
    }
}

/// On/off switch driven by a [`ToggleKey`]
#[derive(Debug, Clone)]
pub struct ToggleSwitch {
    key: ToggleKey,
    on: bool,
}

impl ToggleSwitch {
    pub fn new(on: bool) -> Self {
        Self {
            key: ToggleKey::new(),
            on,
        }
    }

    pub fn poll(&mut self, pressed: bool, now: Instant) -> bool {
        if self.key.poll(pressed, now) {
            self.on = !self.on;
        }
        self.on
    }

    pub fn is_on(&self) -> bool {
        self.on
    }
}
