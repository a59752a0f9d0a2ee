//! Single-variable linear regression used to map sensor duty cycle to °C

/// Trainable model mapping one input to one output.
pub trait Predictor {
    /// Fit the model. Returns false if training did not produce a usable model.
    fn train(&mut self, inputs: &[f32], outputs: &[f32], epochs: u32) -> bool;

    fn predict(&self, x: f32) -> f32;
}

/// `y = weight * x + bias`, fitted by per-sample gradient descent.
pub struct LinReg {
    weight: f32,
    bias: f32,
    learning_rate: f32,
}

impl LinReg {
    pub const fn new(weight: f32, bias: f32, learning_rate: f32) -> Self {
        Self {
            weight,
            bias,
            learning_rate,
        }
    }

    #[inline]
    pub fn weight(&self) -> f32 {
        self.weight
    }

    #[inline]
    pub fn bias(&self) -> f32 {
        self.bias
    }

    fn optimize(&mut self, x: f32, y: f32) {
        let error = y - self.predict(x);
        self.bias += error * self.learning_rate;
        self.weight += error * self.learning_rate * x;
    }
}

impl Predictor for LinReg {
    fn train(&mut self, inputs: &[f32], outputs: &[f32], epochs: u32) -> bool {
        if inputs.is_empty() || inputs.len() != outputs.len() || epochs == 0 {
            return false;
        }
        if !self.learning_rate.is_finite() || self.learning_rate <= 0.0 {
            return false;
        }
        for _ in 0..epochs {
            for (&x, &y) in inputs.iter().zip(outputs) {
                self.optimize(x, y);
            }
        }
        self.weight.is_finite() && self.bias.is_finite()
    }

    #[inline]
    fn predict(&self, x: f32) -> f32 {
        self.weight * x + self.bias
    }
}

/// Round half away from zero, the way predictions are printed.
pub fn round_half_away(value: f32) -> i32 {
    if value < 0.0 {
        (value - 0.5) as i32
    } else {
        (value + 0.5) as i32
    }
}
