use crate::utils::map;

/// Reference temperatures (Celsius) of the three calibration points
pub const TEMP_TIP: [u16; 3] = [200, 300, 400];
/// Default sensor readings at the reference temperatures
pub const DEFAULT_TIP: [u16; 3] = [587, 751, 850];
pub const AMBIENT_TEMP: u16 = 67;
pub const AMBIENT_TEMP_C: u16 = 25;
pub const TEMP_MAX_C: u16 = 500;

/// Translation between internal (sensor) units and Celsius.
///
/// The control loop works in internal units only, this is needed for the
/// telemetry and the operator setters.
pub trait TempUnits {
    fn human(&self, internal: u16) -> u16;
    fn internal(&self, human: u16) -> u16;
}

/// Three point calibration of the hot air gun sensor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Calibration {
    tip: [u16; 3],
    temp_max: u16,
}

impl Default for Calibration {
    fn default() -> Self {
        Calibration {
            tip: DEFAULT_TIP,
            temp_max: 950,
        }
    }
}

impl Calibration {
    /// The readings must grow strictly from the ambient point on.
    pub fn new(tip: [u16; 3], temp_max: u16) -> Option<Self> {
        if AMBIENT_TEMP < tip[0] && tip[0] < tip[1] && tip[1] < tip[2] {
            Some(Calibration { tip, temp_max })
        } else {
            None
        }
    }

    pub fn tip(&self) -> [u16; 3] {
        self.tip
    }

    // segment of the piecewise line, (internal, human) at both ends
    fn segment_internal(&self, internal: u16) -> ((i32, i32), (i32, i32)) {
        let t = self.tip;
        if internal < t[0] {
            ((AMBIENT_TEMP as i32, AMBIENT_TEMP_C as i32), (t[0] as i32, TEMP_TIP[0] as i32))
        } else if internal < t[1] {
            ((t[0] as i32, TEMP_TIP[0] as i32), (t[1] as i32, TEMP_TIP[1] as i32))
        } else {
            ((t[1] as i32, TEMP_TIP[1] as i32), (t[2] as i32, TEMP_TIP[2] as i32))
        }
    }

    fn segment_human(&self, human: u16) -> ((i32, i32), (i32, i32)) {
        if human < TEMP_TIP[0] {
            self.segment_internal(0)
        } else if human < TEMP_TIP[1] {
            self.segment_internal(self.tip[0])
        } else {
            self.segment_internal(self.tip[1])
        }
    }
}

impl TempUnits for Calibration {
    fn human(&self, internal: u16) -> u16 {
        let ((i0, h0), (i1, h1)) = self.segment_internal(internal);
        map(internal as i32, i0, i1, h0, h1).clamp(0, u16::MAX as i32) as u16
    }

    fn internal(&self, human: u16) -> u16 {
        let ((i0, h0), (i1, h1)) = self.segment_human(human);
        map(human as i32, h0, h1, i0, i1).clamp(0, self.temp_max as i32) as u16
    }
}
