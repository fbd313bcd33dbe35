//! Stacked LSTM network evaluated from exported weights.
//!
//! Weight layout matches a Keras export: `kernel` is `input x 4*units`,
//! `recurrent_kernel` is `units x 4*units`, `bias` is `4*units`, with gate
//! blocks ordered input, forget, cell, output.
//!
//! Intermediate LSTM layers feed their full output sequence to the next
//! layer; the last one emits its final state. Bidirectional layers
//! concatenate forward and backward outputs.

use crate::domain::error::TickerdeskError;
use crate::domain::forecast::DEFAULT_WINDOW;
use crate::ports::model_port::SequenceModel;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct LstmWeights {
    pub kernel: Vec<Vec<f64>>,
    pub recurrent_kernel: Vec<Vec<f64>>,
    pub bias: Vec<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LstmLayer {
    pub units: usize,
    #[serde(default)]
    pub bidirectional: bool,
    pub forward: LstmWeights,
    #[serde(default)]
    pub backward: Option<LstmWeights>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Activation {
    #[default]
    Linear,
    Relu,
    Tanh,
    Sigmoid,
}

impl Activation {
    fn apply(self, x: f64) -> f64 {
        match self {
            Activation::Linear => x,
            Activation::Relu => x.max(0.0),
            Activation::Tanh => x.tanh(),
            Activation::Sigmoid => sigmoid(x),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DenseLayer {
    /// `input x output`.
    pub weights: Vec<Vec<f64>>,
    pub bias: Vec<f64>,
    #[serde(default)]
    pub activation: Activation,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LstmNetwork {
    #[serde(default = "default_window")]
    pub window: usize,
    pub lstm: Vec<LstmLayer>,
    #[serde(default)]
    pub dense: Vec<DenseLayer>,
}

fn default_window() -> usize {
    DEFAULT_WINDOW
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

fn shape_error(reason: String) -> TickerdeskError {
    TickerdeskError::ModelShape { reason }
}

fn check_matrix(name: &str, m: &[Vec<f64>], rows: usize, cols: usize) -> Result<(), TickerdeskError> {
    if m.len() != rows {
        return Err(shape_error(format!("{} has {} rows, expected {}", name, m.len(), rows)));
    }
    if let Some((i, row)) = m.iter().enumerate().find(|(_, r)| r.len() != cols) {
        return Err(shape_error(format!(
            "{} row {} has {} columns, expected {}",
            name,
            i,
            row.len(),
            cols
        )));
    }
    if m.iter().flatten().any(|v| !v.is_finite()) {
        return Err(shape_error(format!("{} contains non-finite weights", name)));
    }
    Ok(())
}

fn check_vector(name: &str, v: &[f64], len: usize) -> Result<(), TickerdeskError> {
    if v.len() != len {
        return Err(shape_error(format!("{} has length {}, expected {}", name, v.len(), len)));
    }
    if v.iter().any(|x| !x.is_finite()) {
        return Err(shape_error(format!("{} contains non-finite weights", name)));
    }
    Ok(())
}

impl LstmWeights {
    fn validate(&self, name: &str, input: usize, units: usize) -> Result<(), TickerdeskError> {
        let gates = 4 * units;
        check_matrix(&format!("{} kernel", name), &self.kernel, input, gates)?;
        check_matrix(
            &format!("{} recurrent_kernel", name),
            &self.recurrent_kernel,
            units,
            gates,
        )?;
        check_vector(&format!("{} bias", name), &self.bias, gates)
    }

    /// Hidden state after each step of `inputs`.
    fn run(&self, units: usize, inputs: &[Vec<f64>]) -> Vec<Vec<f64>> {
        let mut h = vec![0.0; units];
        let mut c = vec![0.0; units];
        let mut outputs = Vec::with_capacity(inputs.len());

        for x in inputs {
            let mut z = self.bias.clone();
            for (xj, row) in x.iter().zip(&self.kernel) {
                for (zk, w) in z.iter_mut().zip(row) {
                    *zk += xj * w;
                }
            }
            for (hj, row) in h.iter().zip(&self.recurrent_kernel) {
                for (zk, w) in z.iter_mut().zip(row) {
                    *zk += hj * w;
                }
            }
            for n in 0..units {
                let i = sigmoid(z[n]);
                let f = sigmoid(z[units + n]);
                let g = z[2 * units + n].tanh();
                let o = sigmoid(z[3 * units + n]);
                c[n] = f * c[n] + i * g;
                h[n] = o * c[n].tanh();
            }
            outputs.push(h.clone());
        }
        outputs
    }
}

impl LstmLayer {
    fn output_width(&self) -> usize {
        if self.bidirectional { 2 * self.units } else { self.units }
    }

    fn validate(&self, index: usize, input: usize) -> Result<(), TickerdeskError> {
        if self.units == 0 {
            return Err(shape_error(format!("lstm[{}] has zero units", index)));
        }
        self.forward
            .validate(&format!("lstm[{}].forward", index), input, self.units)?;
        match (&self.backward, self.bidirectional) {
            (Some(backward), true) => {
                backward.validate(&format!("lstm[{}].backward", index), input, self.units)
            }
            (None, true) => Err(shape_error(format!(
                "lstm[{}] is bidirectional but has no backward weights",
                index
            ))),
            (Some(_), false) => Err(shape_error(format!(
                "lstm[{}] has backward weights but is not bidirectional",
                index
            ))),
            (None, false) => Ok(()),
        }
    }

    fn sequence(&self, inputs: &[Vec<f64>]) -> Vec<Vec<f64>> {
        let forward = self.forward.run(self.units, inputs);
        let Some(backward) = self.backward.as_ref().filter(|_| self.bidirectional) else {
            return forward;
        };
        let reversed: Vec<Vec<f64>> = inputs.iter().rev().cloned().collect();
        let mut back = backward.run(self.units, &reversed);
        back.reverse();
        forward
            .into_iter()
            .zip(back)
            .map(|(mut f, b)| {
                f.extend(b);
                f
            })
            .collect()
    }

    fn final_state(&self, inputs: &[Vec<f64>]) -> Vec<f64> {
        let forward = self.forward.run(self.units, inputs);
        let mut state = forward.last().cloned().unwrap_or_else(|| vec![0.0; self.units]);
        if let Some(backward) = self.backward.as_ref().filter(|_| self.bidirectional) {
            let reversed: Vec<Vec<f64>> = inputs.iter().rev().cloned().collect();
            let back = backward.run(self.units, &reversed);
            state.extend(back.last().cloned().unwrap_or_else(|| vec![0.0; self.units]));
        }
        state
    }
}

impl DenseLayer {
    fn apply(&self, input: &[f64]) -> Vec<f64> {
        let mut out = self.bias.clone();
        for (x, row) in input.iter().zip(&self.weights) {
            for (o, w) in out.iter_mut().zip(row) {
                *o += x * w;
            }
        }
        out.into_iter().map(|v| self.activation.apply(v)).collect()
    }
}

impl LstmNetwork {
    /// Check every weight shape against the layer chain. The network must
    /// take one feature per step and end in a single output.
    pub fn validate(&self) -> Result<(), TickerdeskError> {
        if self.window == 0 {
            return Err(shape_error("window must be at least 1".into()));
        }
        if self.lstm.is_empty() {
            return Err(shape_error("network has no LSTM layers".into()));
        }

        let mut width = 1;
        for (i, layer) in self.lstm.iter().enumerate() {
            layer.validate(i, width)?;
            width = layer.output_width();
        }
        for (i, dense) in self.dense.iter().enumerate() {
            let out = dense.bias.len();
            if out == 0 {
                return Err(shape_error(format!("dense[{}] has no outputs", i)));
            }
            check_matrix(&format!("dense[{}] weights", i), &dense.weights, width, out)?;
            check_vector(&format!("dense[{}] bias", i), &dense.bias, out)?;
            width = out;
        }
        if width != 1 {
            return Err(shape_error(format!("network outputs {} values, expected 1", width)));
        }
        Ok(())
    }

    fn forward(&self, window: &[f64]) -> f64 {
        let mut seq: Vec<Vec<f64>> = window.iter().map(|&v| vec![v]).collect();
        let last = self.lstm.len() - 1;
        let mut state = Vec::new();
        for (i, layer) in self.lstm.iter().enumerate() {
            if i == last {
                state = layer.final_state(&seq);
            } else {
                seq = layer.sequence(&seq);
            }
        }
        for dense in &self.dense {
            state = dense.apply(&state);
        }
        state.first().copied().unwrap_or(f64::NAN)
    }
}

impl SequenceModel for LstmNetwork {
    fn window_len(&self) -> usize {
        self.window
    }

    fn predict(&self, window: &[f64]) -> Result<f64, TickerdeskError> {
        if window.len() != self.window {
            return Err(shape_error(format!(
                "window has {} values, model expects {}",
                window.len(),
                self.window
            )));
        }
        if self.lstm.is_empty() {
            return Err(shape_error("network has no LSTM layers".into()));
        }
        Ok(self.forward(window))
    }
}
