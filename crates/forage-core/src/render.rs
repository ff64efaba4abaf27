//! Frame consumers. The simulation never draws; it hands each completed tick
//! to a [`FrameSink`].

use crate::grid::Cell;
use crate::policy::PolicyDisplay;
use crate::simulation::Frame;
use std::collections::HashSet;
use std::io::{self, Write};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("failed to write frame: {0}")]
    Io(#[from] io::Error),
    #[error("failed to encode frame: {0}")]
    Encode(#[from] serde_json::Error),
}

pub trait FrameSink {
    fn present(&mut self, frame: &Frame) -> Result<(), RenderError>;
}

impl<F> FrameSink for F
where
    F: FnMut(&Frame) -> Result<(), RenderError>,
{
    fn present(&mut self, frame: &Frame) -> Result<(), RenderError> {
        self(frame)
    }
}

/// Discards frames.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullSink;

impl FrameSink for NullSink {
    fn present(&mut self, _frame: &Frame) -> Result<(), RenderError> {
        Ok(())
    }
}

/// Writes one JSON document per frame, newline separated.
pub struct JsonLinesSink<W: Write> {
    out: W,
}

impl<W: Write> JsonLinesSink<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> FrameSink for JsonLinesSink<W> {
    fn present(&mut self, frame: &Frame) -> Result<(), RenderError> {
        serde_json::to_writer(&mut self.out, frame)?;
        self.out.write_all(b"\n")?;
        Ok(())
    }
}

const AGENT: char = '@';
const REWARD: char = '*';
const SEEN: char = ':';
const EMPTY: char = '.';
const SHADES: &[char] = &[' ', '.', ':', '-', '=', '+', '*', '#', '%', '@'];

/// ASCII view of the world, the agent's vision window, and the policy's
/// display state.
pub struct TextRenderer<W: Write> {
    out: W,
    /// Side of the square viewport centered on the agent; `None` draws the whole grid.
    view: Option<usize>,
    clear_screen: bool,
}

impl<W: Write> TextRenderer<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            view: None,
            clear_screen: false,
        }
    }

    pub fn with_view(mut self, view: usize) -> Self {
        self.view = Some(view.max(1));
        self
    }

    pub fn with_clear_screen(mut self, clear: bool) -> Self {
        self.clear_screen = clear;
        self
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn write_frame(&mut self, frame: &Frame) -> io::Result<()> {
        if self.clear_screen {
            write!(self.out, "\x1b[2J\x1b[H")?;
        }
        writeln!(
            self.out,
            "tick {} | agent ({}, {}) | reward {} | action {:?} | rewards on grid {}",
            frame.tick,
            frame.agent[0],
            frame.agent[1],
            frame.reward,
            frame.action,
            frame.reward_cells.len()
        )?;

        let n = frame.world_size;
        let rewards: HashSet<[usize; 2]> = frame.reward_cells.iter().copied().collect();
        let side = self.view.map_or(n, |v| v.min(n));
        let origin = if side == n {
            [0, 0]
        } else {
            let half = side / 2;
            [
                (frame.agent[0] + n - half % n) % n,
                (frame.agent[1] + n - half % n) % n,
            ]
        };

        let mut line = String::with_capacity(side);
        for row in 0..side {
            line.clear();
            let y = (origin[1] + row) % n;
            for col in 0..side {
                let x = (origin[0] + col) % n;
                let glyph = if [x, y] == frame.agent {
                    AGENT
                } else if rewards.contains(&[x, y]) {
                    REWARD
                } else if frame.vision.contains(x, y) {
                    SEEN
                } else {
                    EMPTY
                };
                line.push(glyph);
            }
            writeln!(self.out, "{line}")?;
        }

        writeln!(self.out, "vision:")?;
        for cells in frame.observation.rows() {
            line.clear();
            line.extend(cells.iter().map(|c| match c {
                Cell::Reward => REWARD,
                Cell::Empty => EMPTY,
            }));
            writeln!(self.out, "  {line}")?;
        }

        if let Some(display) = &frame.policy_display {
            self.write_policy(display)?;
        }
        self.out.flush()
    }

    fn write_policy(&mut self, display: &PolicyDisplay) -> io::Result<()> {
        writeln!(self.out, "policy: {}", display.label)?;
        for (name, values) in &display.layers {
            let bar: String = values.iter().map(|&v| shade(v)).collect();
            writeln!(self.out, "  {name:>6} [{bar}]")?;
        }
        if let Some(action) = display.preferred {
            writeln!(self.out, "  prefers {action:?}")?;
        }
        Ok(())
    }
}

/// Map an activation in `[-1, 1]` onto a density glyph.
fn shade(value: f32) -> char {
    let t = ((value.clamp(-1.0, 1.0) + 1.0) / 2.0 * (SHADES.len() - 1) as f32).round();
    SHADES[t as usize]
}

impl<W: Write> FrameSink for TextRenderer<W> {
    fn present(&mut self, frame: &Frame) -> Result<(), RenderError> {
        Ok(self.write_frame(frame)?)
    }
}
