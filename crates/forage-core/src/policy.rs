//! Decision-making side of the loop.
//!
//! The simulation only sees the [`Policy`] trait: a flattened `0/1`
//! observation and a `0/1` reward go in, a raw action code comes out. Codes
//! are decoded by the loop, so a policy that answers with something other
//! than 0..=3 surfaces as an invalid action rather than being clamped.

use crate::agent::Action;
use crate::nn::{Activations, NeuralNet};
use crate::vision::Observation;
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha12Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("policy could not produce an action: {reason}")]
pub struct PolicyError {
    pub reason: String,
}

impl PolicyError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Read-only view of a policy's internals for display.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PolicyDisplay {
    pub label: String,
    /// Named activity layers, each normalized to roughly `[-1, 1]`.
    pub layers: Vec<(String, Vec<f32>)>,
    /// Action the policy currently prefers for the shown observation.
    pub preferred: Option<Action>,
}

pub trait Policy {
    fn choose_action(&mut self, observation: &[u8], reward: u8) -> Result<u8, PolicyError>;

    /// Internal state to visualize next to the world, given the 2-D observation.
    fn display_state(&self, _observation: &Observation) -> Option<PolicyDisplay> {
        None
    }
}

impl<P: Policy + ?Sized> Policy for Box<P> {
    fn choose_action(&mut self, observation: &[u8], reward: u8) -> Result<u8, PolicyError> {
        (**self).choose_action(observation, reward)
    }

    fn display_state(&self, observation: &Observation) -> Option<PolicyDisplay> {
        (**self).display_state(observation)
    }
}

/// Replays a fixed sequence of action codes, cycling forever.
#[derive(Clone, Debug)]
pub struct ScriptedPolicy {
    codes: Vec<u8>,
    cursor: usize,
}

impl ScriptedPolicy {
    pub fn new(codes: Vec<u8>) -> Self {
        Self { codes, cursor: 0 }
    }

    pub fn from_actions(actions: &[Action]) -> Self {
        Self::new(actions.iter().map(|a| a.code()).collect())
    }
}

impl Policy for ScriptedPolicy {
    fn choose_action(&mut self, _observation: &[u8], _reward: u8) -> Result<u8, PolicyError> {
        if self.codes.is_empty() {
            return Err(PolicyError::new("scripted policy has no actions"));
        }
        let code = self.codes[self.cursor % self.codes.len()];
        self.cursor = self.cursor.wrapping_add(1);
        Ok(code)
    }
}

/// Uniformly random moves from a seeded stream.
#[derive(Clone, Debug)]
pub struct RandomPolicy {
    rng: ChaCha12Rng,
}

impl RandomPolicy {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha12Rng::seed_from_u64(seed),
        }
    }
}

impl Policy for RandomPolicy {
    fn choose_action(&mut self, _observation: &[u8], _reward: u8) -> Result<u8, PolicyError> {
        Ok(self.rng.random_range(0..4u8))
    }
}

/// Heads for the nearest visible reward (Manhattan distance on the window);
/// wanders randomly when none is in view.
#[derive(Clone, Debug)]
pub struct SeekerPolicy {
    rng: ChaCha12Rng,
}

impl SeekerPolicy {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha12Rng::seed_from_u64(seed),
        }
    }

    fn target(observation: &[u8]) -> Option<Action> {
        let side = (observation.len() as f64).sqrt() as usize;
        if side == 0 || side * side != observation.len() {
            return None;
        }
        let half = (side / 2) as i64;
        let (dx, dy) = observation
            .iter()
            .enumerate()
            .filter(|(_, v)| **v != 0)
            .map(|(idx, _)| ((idx % side) as i64 - half, (idx / side) as i64 - half))
            .filter(|&(dx, dy)| dx != 0 || dy != 0)
            .min_by_key(|&(dx, dy)| dx.abs() + dy.abs())?;
        Some(if dx.abs() >= dy.abs() {
            if dx > 0 {
                Action::Right
            } else {
                Action::Left
            }
        } else if dy > 0 {
            Action::Down
        } else {
            Action::Up
        })
    }
}

impl Policy for SeekerPolicy {
    fn choose_action(&mut self, observation: &[u8], _reward: u8) -> Result<u8, PolicyError> {
        match Self::target(observation) {
            Some(action) => Ok(action.code()),
            None => Ok(self.rng.random_range(0..4u8)),
        }
    }

    fn display_state(&self, observation: &Observation) -> Option<PolicyDisplay> {
        Some(PolicyDisplay {
            label: "seeker".to_string(),
            layers: Vec::new(),
            preferred: Self::target(&observation.flatten()),
        })
    }
}

/// Fixed-weight feed-forward net over the vision window. Picks the strongest
/// output, with `epsilon`-probability random exploration.
#[derive(Clone, Debug)]
pub struct NeuralPolicy {
    net: NeuralNet,
    epsilon: f32,
    rng: ChaCha12Rng,
    rewards_seen: u64,
}

impl NeuralPolicy {
    pub fn new(net: NeuralNet, epsilon: f32, seed: u64) -> Self {
        Self {
            net,
            epsilon: epsilon.clamp(0.0, 1.0),
            rng: ChaCha12Rng::seed_from_u64(seed),
            rewards_seen: 0,
        }
    }

    /// Random weights sized for a `vision_size × vision_size` window.
    pub fn random(vision_size: usize, hidden_size: usize, epsilon: f32, seed: u64) -> Self {
        let mut rng = ChaCha12Rng::seed_from_u64(seed);
        let net = NeuralNet::random(vision_size * vision_size, hidden_size, &mut rng);
        Self::new(net, epsilon, seed.wrapping_add(1))
    }

    pub fn net(&self) -> &NeuralNet {
        &self.net
    }

    pub fn rewards_seen(&self) -> u64 {
        self.rewards_seen
    }

    fn activate(&self, observation: &[u8]) -> Result<Activations, PolicyError> {
        if observation.len() != self.net.input_size() {
            return Err(PolicyError::new(format!(
                "observation has {} cells, network expects {}",
                observation.len(),
                self.net.input_size()
            )));
        }
        let input: Vec<f32> = observation.iter().map(|&v| v as f32).collect();
        Ok(self.net.forward(&input))
    }
}

impl Policy for NeuralPolicy {
    fn choose_action(&mut self, observation: &[u8], reward: u8) -> Result<u8, PolicyError> {
        self.rewards_seen += reward as u64;
        let activations = self.activate(observation)?;
        if self.epsilon > 0.0 && self.rng.random::<f32>() < self.epsilon {
            return Ok(self.rng.random_range(0..4u8));
        }
        Ok(activations.argmax() as u8)
    }

    fn display_state(&self, observation: &Observation) -> Option<PolicyDisplay> {
        let flat = observation.flatten();
        let activations = self.activate(&flat).ok()?;
        let preferred = Action::try_from(activations.argmax() as u8).ok();
        Some(PolicyDisplay {
            label: format!("neural ({} rewards)", self.rewards_seen),
            layers: vec![
                ("input".to_string(), flat.iter().map(|&v| v as f32).collect()),
                ("hidden".to_string(), activations.hidden),
                ("output".to_string(), activations.output.to_vec()),
            ],
            preferred,
        })
    }
}
