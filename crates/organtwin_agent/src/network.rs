//! Q-network: a small ReLU MLP mapping an encoded state to one value per action.
//!
//! Architecture (default): 23 inputs → 128 → 64 → 32 (ReLU) → 8 outputs (linear)
//!
//! Two copies exist at runtime: the online network, updated every training
//! step, and the target network, overwritten from the online one on a fixed
//! cadence. Gradients are held in a network of the same shape so the
//! optimizer can walk both in lockstep.

use rand::Rng;
use serde::{Deserialize, Serialize};

/// One fully connected layer. `weights` is (outputs × inputs).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DenseLayer {
    weights: Vec<Vec<f32>>,
    bias: Vec<f32>,
}

impl DenseLayer {
    /// Uniform init in ±1/sqrt(fan_in).
    fn new(inputs: usize, outputs: usize, rng: &mut impl Rng) -> Self {
        let bound = 1.0 / (inputs as f32).sqrt();
        let weights = (0..outputs)
            .map(|_| (0..inputs).map(|_| rng.gen_range(-bound..bound)).collect())
            .collect();
        let bias = (0..outputs).map(|_| rng.gen_range(-bound..bound)).collect();
        Self { weights, bias }
    }

    fn zeros(inputs: usize, outputs: usize) -> Self {
        Self {
            weights: vec![vec![0.0; inputs]; outputs],
            bias: vec![0.0; outputs],
        }
    }

    pub fn inputs(&self) -> usize {
        self.weights.first().map_or(0, |row| row.len())
    }

    pub fn outputs(&self) -> usize {
        self.bias.len()
    }

    fn forward(&self, input: &[f32], relu: bool) -> Vec<f32> {
        self.weights
            .iter()
            .zip(&self.bias)
            .map(|(row, b)| {
                let z = row.iter().zip(input).map(|(w, x)| w * x).sum::<f32>() + b;
                if relu {
                    z.max(0.0)
                } else {
                    z
                }
            })
            .collect()
    }

    fn well_formed(&self) -> bool {
        let n = self.inputs();
        self.weights.len() == self.bias.len()
            && self.weights.iter().all(|row| row.len() == n)
            && self
                .weights
                .iter()
                .flatten()
                .chain(&self.bias)
                .all(|v| v.is_finite())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QNetwork {
    layers: Vec<DenseLayer>,
}

impl QNetwork {
    pub fn new(inputs: usize, hidden: &[usize], outputs: usize, rng: &mut impl Rng) -> Self {
        let widths: Vec<usize> = std::iter::once(inputs)
            .chain(hidden.iter().copied())
            .chain(std::iter::once(outputs))
            .collect();
        let layers = widths
            .windows(2)
            .map(|w| DenseLayer::new(w[0], w[1], rng))
            .collect();
        Self { layers }
    }

    /// A zero-filled network with the same shape, used as a gradient buffer.
    pub fn zeros_like(&self) -> Self {
        Self {
            layers: self
                .layers
                .iter()
                .map(|l| DenseLayer::zeros(l.inputs(), l.outputs()))
                .collect(),
        }
    }

    /// Layer widths, input first.
    pub fn shape(&self) -> Vec<usize> {
        let mut shape: Vec<usize> = self.layers.iter().map(|l| l.inputs()).collect();
        if let Some(last) = self.layers.last() {
            shape.push(last.outputs());
        }
        shape
    }

    pub fn input_dim(&self) -> usize {
        self.layers.first().map_or(0, |l| l.inputs())
    }

    pub fn output_dim(&self) -> usize {
        self.layers.last().map_or(0, |l| l.outputs())
    }

    pub fn parameter_count(&self) -> usize {
        self.layers
            .iter()
            .map(|l| l.inputs() * l.outputs() + l.outputs())
            .sum()
    }

    /// Every layer rectangular, consecutive widths agree, all values finite.
    pub fn is_well_formed(&self) -> bool {
        !self.layers.is_empty()
            && self.layers.iter().all(DenseLayer::well_formed)
            && self
                .layers
                .windows(2)
                .all(|w| w[0].outputs() == w[1].inputs())
    }

    /// Per-action values for one state.
    pub fn forward(&self, input: &[f32]) -> Vec<f32> {
        let last = self.layers.len().saturating_sub(1);
        self.layers
            .iter()
            .enumerate()
            .fold(input.to_vec(), |x, (i, layer)| layer.forward(&x, i < last))
    }

    /// Forward pass keeping every activation: [input, hidden..., output].
    fn forward_trace(&self, input: &[f32]) -> Vec<Vec<f32>> {
        let last = self.layers.len().saturating_sub(1);
        let mut acts = Vec::with_capacity(self.layers.len() + 1);
        acts.push(input.to_vec());
        for (i, layer) in self.layers.iter().enumerate() {
            let next = layer.forward(&acts[i], i < last);
            acts.push(next);
        }
        acts
    }

    /// Forward pass, then backpropagate `d_output` (dLoss/dOutput) and add
    /// the parameter gradients into `grads`. Returns the forward output.
    pub fn accumulate_gradients(
        &self,
        input: &[f32],
        output_grad: impl FnOnce(&[f32]) -> Vec<f32>,
        grads: &mut QNetwork,
    ) -> Vec<f32> {
        let acts = self.forward_trace(input);
        let output = acts[acts.len() - 1].clone();
        let mut delta = output_grad(&output);

        for l in (0..self.layers.len()).rev() {
            let layer = &self.layers[l];
            let layer_input = &acts[l];
            let g = &mut grads.layers[l];

            for (i, d) in delta.iter().enumerate() {
                if *d == 0.0 {
                    continue;
                }
                for (gw, x) in g.weights[i].iter_mut().zip(layer_input) {
                    *gw += d * x;
                }
                g.bias[i] += d;
            }

            if l > 0 {
                // Inputs to this layer are ReLU outputs of the previous one.
                let mut prev = vec![0.0f32; layer.inputs()];
                for (i, d) in delta.iter().enumerate() {
                    if *d == 0.0 {
                        continue;
                    }
                    for (p, w) in prev.iter_mut().zip(&layer.weights[i]) {
                        *p += w * d;
                    }
                }
                for (p, a) in prev.iter_mut().zip(layer_input) {
                    if *a <= 0.0 {
                        *p = 0.0;
                    }
                }
                delta = prev;
            }
        }
        output
    }

    /// L2 norm over every parameter (used on gradient buffers).
    pub fn global_norm(&self) -> f32 {
        self.layers
            .iter()
            .flat_map(|l| l.weights.iter().flatten().chain(&l.bias))
            .map(|v| v * v)
            .sum::<f32>()
            .sqrt()
    }

    pub fn scale(&mut self, factor: f32) {
        for l in &mut self.layers {
            for v in l.weights.iter_mut().flatten().chain(l.bias.iter_mut()) {
                *v *= factor;
            }
        }
    }

    /// Rescale so the global norm is at most `max_norm`. Returns the norm before clipping.
    pub fn clip_norm(&mut self, max_norm: f32) -> f32 {
        let norm = self.global_norm();
        if norm > max_norm {
            self.scale(max_norm / (norm + 1e-6));
        }
        norm
    }
}

/// Adam optimizer state for one network.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Adam {
    pub learning_rate: f32,
    pub beta1: f32,
    pub beta2: f32,
    pub eps: f32,
    steps: u64,
    m: QNetwork,
    v: QNetwork,
}

impl Adam {
    pub fn new(net: &QNetwork, learning_rate: f32) -> Self {
        Self {
            learning_rate,
            beta1: 0.9,
            beta2: 0.999,
            eps: 1e-8,
            steps: 0,
            m: net.zeros_like(),
            v: net.zeros_like(),
        }
    }

    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// Moment buffers match the network they will update.
    pub fn fits(&self, net: &QNetwork) -> bool {
        self.m.shape() == net.shape() && self.v.shape() == net.shape()
    }

    pub fn step(&mut self, net: &mut QNetwork, grads: &QNetwork) {
        self.steps += 1;
        let t = self.steps.min(i32::MAX as u64) as i32;
        let bc1 = 1.0 - self.beta1.powi(t);
        let bc2 = 1.0 - self.beta2.powi(t);
        let (b1, b2, lr, eps) = (self.beta1, self.beta2, self.learning_rate, self.eps);

        let update = |p: &mut f32, g: f32, m: &mut f32, v: &mut f32| {
            *m = b1 * *m + (1.0 - b1) * g;
            *v = b2 * *v + (1.0 - b2) * g * g;
            let m_hat = *m / bc1;
            let v_hat = *v / bc2;
            *p -= lr * m_hat / (v_hat.sqrt() + eps);
        };

        for (l, layer) in net.layers.iter_mut().enumerate() {
            let g = &grads.layers[l];
            let m = &mut self.m.layers[l];
            let v = &mut self.v.layers[l];
            for i in 0..layer.weights.len() {
                for j in 0..layer.weights[i].len() {
                    update(
                        &mut layer.weights[i][j],
                        g.weights[i][j],
                        &mut m.weights[i][j],
                        &mut v.weights[i][j],
                    );
                }
                update(&mut layer.bias[i], g.bias[i], &mut m.bias[i], &mut v.bias[i]);
            }
        }
    }
}
