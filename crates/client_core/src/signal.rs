//! Signal-strength telemetry driven by formation mode and transmission state.

use rand::Rng;
use shared::domain::{Formation, TransmissionState};

pub const SIGNAL_MIN: f64 = 0.0;
pub const SIGNAL_MAX: f64 = 100.0;
/// Upper bound of the jitter targets while the formation is RANDOM.
pub const RANDOM_TARGET_CEILING: f64 = 60.0;
/// Fraction of the remaining distance covered per tick in the RANDOM regime.
pub const RANDOM_PULL: f64 = 0.2;
/// Fixed step per tick toward full scale in every other regime.
pub const CONVERGENCE_STEP: f64 = 4.0;
/// Drop applied when a transmission completes.
pub const TRANSMISSION_DRAIN: f64 = 50.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalRegime {
    Frozen,
    Jitter,
    Converge,
}

impl SignalRegime {
    pub fn select(formation: &Formation, transmission: TransmissionState) -> Self {
        if transmission.is_transmitting() {
            SignalRegime::Frozen
        } else if formation.is_random() {
            SignalRegime::Jitter
        } else {
            SignalRegime::Converge
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SignalSimulator {
    value: f64,
}

impl SignalSimulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn starting_at(value: f64) -> Self {
        Self {
            value: clamp_signal(value),
        }
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn tick<R: Rng + ?Sized>(
        &mut self,
        formation: &Formation,
        transmission: TransmissionState,
        rng: &mut R,
    ) -> f64 {
        let next = match SignalRegime::select(formation, transmission) {
            SignalRegime::Frozen => self.value,
            SignalRegime::Jitter => {
                let target = rng.gen_range(0.0..=RANDOM_TARGET_CEILING);
                self.value + (target - self.value) * RANDOM_PULL
            }
            SignalRegime::Converge => step_toward(self.value, SIGNAL_MAX, CONVERGENCE_STEP),
        };
        self.value = clamp_signal(next);
        self.value
    }

    pub fn apply_transmission_drain(&mut self) -> f64 {
        self.value = clamp_signal(self.value - TRANSMISSION_DRAIN);
        self.value
    }
}

fn step_toward(current: f64, target: f64, step: f64) -> f64 {
    if (current - target).abs() < step {
        target
    } else if current < target {
        current + step
    } else {
        current - step
    }
}

fn clamp_signal(value: f64) -> f64 {
    value.clamp(SIGNAL_MIN, SIGNAL_MAX)
}
