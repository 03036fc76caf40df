pub const HIST_LENGTH: usize = 16;

// dispersion smoothing coefficient, the spread follows the last ~8 samples
const DISP_K: u32 = 8;

/// Sliding history of the raw sensor readings.
///
/// `read()` is the rounded mean of the stored samples. `dispersion()` is an
/// exponential average of the squared deviation of each new sample from the
/// mean it arrived at, so recent readings dominate. It saturates at
/// `u16::MAX` and is zero for a constant signal.
#[derive(Clone, Debug)]
pub struct SampleFilter {
    history: [u16; HIST_LENGTH],
    len: usize,
    write_idx: usize,
    sum: u32,
    disp: u32,
}

impl Default for SampleFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl SampleFilter {
    pub const fn new() -> SampleFilter {
        SampleFilter {
            history: [0; HIST_LENGTH],
            len: 0,
            write_idx: 0,
            sum: 0,
            disp: 0,
        }
    }

    pub fn reset(&mut self) {
        *self = SampleFilter::new();
    }

    pub fn update(&mut self, sample: u16) {
        if self.len > 0 {
            let mean = self.read() as i32;
            let dev = (sample as i32 - mean).unsigned_abs().min(u16::MAX as u32);
            let sq = dev * dev / DISP_K;
            self.disp = self.disp - (self.disp + DISP_K - 1) / DISP_K + sq;
        }
        if self.len < HIST_LENGTH {
            self.len += 1;
        } else {
            self.sum -= self.history[self.write_idx] as u32;
        }
        self.history[self.write_idx] = sample;
        self.sum += sample as u32;
        self.write_idx = (self.write_idx + 1) % HIST_LENGTH;
    }

    pub fn read(&self) -> u16 {
        if self.len == 0 {
            return 0;
        }
        let len = self.len as u32;
        ((self.sum + len / 2) / len) as u16
    }

    pub fn last(&self) -> u16 {
        if self.len == 0 {
            return 0;
        }
        let index = if self.write_idx == 0 {
            HIST_LENGTH - 1
        } else {
            self.write_idx - 1
        };
        self.history[index]
    }

    pub fn dispersion(&self) -> u16 {
        self.disp.min(u16::MAX as u32) as u16
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}
