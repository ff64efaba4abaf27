//! Single-agent foraging on a toroidal reward grid.
//!
//! A [`simulation::Simulation`] owns the [`grid::WorldGrid`], the
//! [`agent::Agent`] and a [`policy::Policy`], and advances them one tick at a
//! time: observe, resolve reward, ask the policy, move, hand a
//! [`simulation::Frame`] to a [`render::FrameSink`].

pub mod agent;
pub mod config;
pub mod grid;
pub mod nn;
pub mod policy;
pub mod render;
pub mod simulation;
pub mod vision;

pub use agent::{Action, Agent, InvalidAction};
pub use config::{SimConfig, SimConfigError};
pub use grid::{Cell, Collection, WorldGrid};
pub use policy::{Policy, PolicyDisplay, PolicyError};
pub use render::{FrameSink, RenderError};
pub use simulation::{Frame, SimError, Simulation};
pub use vision::{Observation, VisionBounds};
