//! Feed-forward network: vision inputs → hidden (tanh) → 4 action scores (tanh).
//!
//! Input width follows the vision window (`vision_size²`), so weights are
//! heap-allocated. Layout of a flat weight vector:
//! input→hidden (in×hid), hidden bias (hid), hidden→output (hid×4), output bias (4).

use rand::Rng;
use thiserror::Error;

pub const OUTPUT_SIZE: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("expected {expected} weights, got {actual}")]
pub struct WeightCountMismatch {
    pub expected: usize,
    pub actual: usize,
}

#[derive(Clone, Debug, PartialEq)]
pub struct NeuralNet {
    input_size: usize,
    hidden_size: usize,
    w_ih: Vec<f32>, // input_size × hidden_size, row per input
    b_h: Vec<f32>,
    w_ho: Vec<f32>, // hidden_size × OUTPUT_SIZE, row per hidden unit
    b_o: [f32; OUTPUT_SIZE],
}

/// Per-layer activations from one forward pass.
#[derive(Clone, Debug, PartialEq)]
pub struct Activations {
    pub hidden: Vec<f32>,
    pub output: [f32; OUTPUT_SIZE],
}

impl Activations {
    /// Index of the strongest output; ties go to the lowest index.
    pub fn argmax(&self) -> usize {
        let mut best = 0;
        for (i, &o) in self.output.iter().enumerate().skip(1) {
            if o > self.output[best] {
                best = i;
            }
        }
        best
    }
}

impl NeuralNet {
    pub fn weight_count(input_size: usize, hidden_size: usize) -> usize {
        input_size * hidden_size + hidden_size + hidden_size * OUTPUT_SIZE + OUTPUT_SIZE
    }

    pub fn from_weights(
        input_size: usize,
        hidden_size: usize,
        weights: &[f32],
    ) -> Result<Self, WeightCountMismatch> {
        let expected = Self::weight_count(input_size, hidden_size);
        if weights.len() != expected {
            return Err(WeightCountMismatch {
                expected,
                actual: weights.len(),
            });
        }
        Ok(Self::from_parts(input_size, hidden_size, weights))
    }

    /// Weights drawn uniformly from `[-1, 1)`.
    pub fn random<R: Rng + ?Sized>(input_size: usize, hidden_size: usize, rng: &mut R) -> Self {
        let weights: Vec<f32> = (0..Self::weight_count(input_size, hidden_size))
            .map(|_| rng.random::<f32>() * 2.0 - 1.0)
            .collect();
        Self::from_parts(input_size, hidden_size, &weights)
    }

    fn from_parts(input_size: usize, hidden_size: usize, weights: &[f32]) -> Self {
        let (w_ih, rest) = weights.split_at(input_size * hidden_size);
        let (b_h, rest) = rest.split_at(hidden_size);
        let (w_ho, b_o) = rest.split_at(hidden_size * OUTPUT_SIZE);
        let mut bias_out = [0.0f32; OUTPUT_SIZE];
        bias_out.copy_from_slice(b_o);
        Self {
            input_size,
            hidden_size,
            w_ih: w_ih.to_vec(),
            b_h: b_h.to_vec(),
            w_ho: w_ho.to_vec(),
            b_o: bias_out,
        }
    }

    pub fn input_size(&self) -> usize {
        self.input_size
    }

    pub fn hidden_size(&self) -> usize {
        self.hidden_size
    }

    pub fn to_weight_vec(&self) -> Vec<f32> {
        let mut out = Vec::with_capacity(Self::weight_count(self.input_size, self.hidden_size));
        out.extend_from_slice(&self.w_ih);
        out.extend_from_slice(&self.b_h);
        out.extend_from_slice(&self.w_ho);
        out.extend_from_slice(&self.b_o);
        out
    }

    /// Forward pass. Inputs beyond `input_size` are ignored, missing ones read as 0.
    pub fn forward(&self, input: &[f32]) -> Activations {
        let mut hidden = self.b_h.clone();
        for (i, &x) in input.iter().take(self.input_size).enumerate() {
            if x == 0.0 {
                continue;
            }
            let row = &self.w_ih[i * self.hidden_size..(i + 1) * self.hidden_size];
            for (h, &w) in hidden.iter_mut().zip(row) {
                *h += x * w;
            }
        }
        for h in &mut hidden {
            *h = h.tanh();
        }

        let mut output = self.b_o;
        for (i, &h) in hidden.iter().enumerate() {
            let row = &self.w_ho[i * OUTPUT_SIZE..(i + 1) * OUTPUT_SIZE];
            for (o, &w) in output.iter_mut().zip(row) {
                *o += h * w;
            }
        }
        for o in &mut output {
            *o = o.tanh();
        }

        Activations { hidden, output }
    }
}
