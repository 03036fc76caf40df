use core::cell::RefCell;
use critical_section::Mutex;
use embedded_hal::digital::v2::OutputPin;

use crate::devices::sensor::Sensor;
use crate::hist::SampleFilter;
use crate::phase::PhaseModulator;

struct TickState<GATE, SENSOR> {
    modulator: PhaseModulator<GATE>,
    sensor: SENSOR,
    temp: SampleFilter,
}

/// Everything the AC zero-cross interrupt touches: phase counter, duty,
/// heater gate and the temperature history.
///
/// Lives in a `static`, the interrupt calls [`TickPath::sync_cb`] and the
/// main loop reaches the same state through the other methods. Each access
/// runs inside a critical section, so the main loop never sees a half
/// finished tick.
pub struct TickPath<GATE, SENSOR> {
    state: Mutex<RefCell<Option<TickState<GATE, SENSOR>>>>,
}

impl<GATE, SENSOR> TickPath<GATE, SENSOR>
where
    GATE: OutputPin,
    SENSOR: Sensor,
{
    pub const fn empty() -> Self {
        TickPath {
            state: Mutex::new(RefCell::new(None)),
        }
    }

    pub fn new(modulator: PhaseModulator<GATE>, sensor: SENSOR) -> Self {
        let tick = TickPath::empty();
        tick.install(modulator, sensor);
        tick
    }

    /// Move the configured hardware into the shared state.
    pub fn install(&self, modulator: PhaseModulator<GATE>, sensor: SENSOR) {
        critical_section::with(|cs| {
            self.state.borrow(cs).replace(Some(TickState {
                modulator,
                sensor,
                temp: SampleFilter::new(),
            }));
        });
    }

    pub fn is_installed(&self) -> bool {
        critical_section::with(|cs| self.state.borrow(cs).borrow().is_some())
    }

    /// One AC half-cycle. Returns true at the end of the power period.
    pub fn sync_cb(&self, now_ms: u32) -> bool {
        critical_section::with(|cs| {
            let mut state = self.state.borrow_ref_mut(cs);
            let state = match state.as_mut() {
                None => return false,
                Some(state) => state,
            };
            let end_of_period = state.modulator.sync(now_ms);
            // skip the sample if the conversion is not ready or failed
            if let Ok(t) = state.sensor.read() {
                state.temp.update(t);
            }
            end_of_period
        })
    }

    pub fn set_duty(&self, duty: u8) {
        self.with_state(|state| state.modulator.set_duty(duty));
    }

    pub fn cut(&self) {
        self.with_state(|state| state.modulator.cut());
    }

    pub fn duty(&self) -> u8 {
        self.with_state(|state| state.modulator.duty()).unwrap_or(0)
    }

    pub fn counter(&self) -> u8 {
        self.with_state(|state| state.modulator.counter())
            .unwrap_or(0)
    }

    pub fn gate_active(&self) -> bool {
        self.with_state(|state| state.modulator.is_active())
            .unwrap_or(false)
    }

    pub fn average_temp(&self) -> u16 {
        self.with_state(|state| state.temp.read()).unwrap_or(0)
    }

    pub fn last_temp(&self) -> u16 {
        self.with_state(|state| state.temp.last()).unwrap_or(0)
    }

    pub fn temp_dispersion(&self) -> u16 {
        self.with_state(|state| state.temp.dispersion())
            .unwrap_or(0)
    }

    /// Feed a reading taken outside of the tick, e.g. while tuning.
    pub fn update_temp(&self, value: u16) {
        self.with_state(|state| state.temp.update(value));
    }

    pub fn reset_temp(&self) {
        self.with_state(|state| state.temp.reset());
    }

    /// The zero-cross interrupts keep coming as long as the mains is there.
    pub fn is_synchronized(&self, now_ms: u32, timeout_ms: u32) -> bool {
        self.with_state(|state| {
            now_ms.wrapping_sub(state.modulator.last_period()) < timeout_ms
        })
        .unwrap_or(false)
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut TickState<GATE, SENSOR>) -> R) -> Option<R> {
        critical_section::with(|cs| self.state.borrow_ref_mut(cs).as_mut().map(f))
    }
}
