/// Exponential moving average kept multiplied by its length.
///
/// The accumulator holds roughly `length * average`, each update mixes in
/// `1/length` of the new value.
#[derive(Clone, Debug)]
pub struct TrendFilter {
    emp_k: i64,
    emp_data: i64,
}

impl TrendFilter {
    pub const fn new(length: u16) -> TrendFilter {
        let emp_k = if length == 0 { 1 } else { length as i64 };
        TrendFilter { emp_k, emp_data: 0 }
    }

    /// Change the window length, the history is dropped.
    pub fn set_length(&mut self, length: u16) {
        *self = TrendFilter::new(length);
    }

    pub fn length(&self) -> u16 {
        self.emp_k as u16
    }

    pub fn reset(&mut self) {
        self.emp_data = 0;
    }

    pub fn update(&mut self, value: i32) {
        self.emp_data = self.mixed(value);
    }

    /// The average the filter would report after `update(value)`.
    pub fn average(&self, value: i32) -> i32 {
        self.scaled(self.mixed(value))
    }

    pub fn read(&self) -> i32 {
        self.scaled(self.emp_data)
    }

    fn mixed(&self, value: i32) -> i64 {
        self.emp_data + value as i64 - self.scaled(self.emp_data) as i64
    }

    fn scaled(&self, data: i64) -> i32 {
        let round_v = self.emp_k >> 1;
        ((data + round_v) / self.emp_k) as i32
    }
}
