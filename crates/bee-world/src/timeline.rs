//! Frame-keyed action sequences

use bee_core::{BeeError, Result};
use std::collections::BTreeMap;
use std::fmt::Write;

/// Actions that fired during one [`Timeline::step_to`]
#[derive(Debug, Clone, PartialEq)]
pub struct TimelineStep<A> {
    /// In frame order, then insertion order within a frame
    pub fired: Vec<A>,
    /// The last action has fired and the timeline stopped
    pub finished: bool,
}

/// Named actions keyed by the frame they fire on.
///
/// The timeline does not run anything itself: stepping hands back the
/// actions that are due so the owner can run them with whatever context
/// they need. Frames are counted from `start`, plus the start offset,
/// minus the frames spent paused.
#[derive(Debug, Clone)]
pub struct Timeline<A> {
    pub name: String,
    actions: BTreeMap<u64, Vec<(String, A)>>,
    end_action: Option<A>,
    started_at: Option<u64>,
    /// First frame whose actions have not fired yet
    next_frame: u64,
    position: u64,
    start_offset: u64,
    pause_offset: u64,
    paused_at: Option<u64>,
    pub is_looping: bool,
}

impl<A: Clone> Timeline<A> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            actions: BTreeMap::new(),
            end_action: None,
            started_at: None,
            next_frame: 0,
            position: 0,
            start_offset: 0,
            pause_offset: 0,
            paused_at: None,
            is_looping: false,
        }
    }

    pub fn is_running(&self) -> bool {
        self.started_at.is_some() && self.paused_at.is_none()
    }

    pub fn is_paused(&self) -> bool {
        self.paused_at.is_some()
    }

    /// Frame reached by the last step
    pub fn position(&self) -> u64 {
        self.position
    }

    pub fn start_offset(&self) -> u64 {
        self.start_offset
    }

    pub fn action_count(&self) -> usize {
        self.actions.values().map(Vec::len).sum()
    }

    /// Add an action. Not allowed while the timeline runs.
    pub fn add_action(&mut self, frame: u64, name: impl Into<String>, action: A) -> Result<()> {
        if self.is_running() {
            return Err(BeeError::NotApplicable(format!(
                "timeline \"{}\" is running",
                self.name
            )));
        }
        self.actions
            .entry(frame)
            .or_default()
            .push((name.into(), action));
        Ok(())
    }

    /// Remove the first action at `frame`
    pub fn remove_action(&mut self, frame: u64) -> Result<(String, A)> {
        let Some(list) = self.actions.get_mut(&frame) else {
            return Err(BeeError::NotApplicable(format!(
                "timeline \"{}\" has no action at frame {frame}",
                self.name
            )));
        };
        let removed = list.remove(0);
        if list.is_empty() {
            self.actions.remove(&frame);
        }
        Ok(removed)
    }

    pub fn set_offset(&mut self, offset: u64) {
        self.start_offset = offset;
    }

    /// Start at the first action instead of frame zero
    pub fn clip_offset(&mut self) {
        if let Some(&first) = self.actions.keys().next() {
            self.start_offset = first;
        }
    }

    pub fn set_end_action(&mut self, action: A) {
        self.end_action = Some(action);
    }

    /// Begin running at `frame`. Actions before the start offset are skipped.
    pub fn start(&mut self, frame: u64) {
        self.started_at = Some(frame);
        self.next_frame = self.start_offset;
        self.position = self.start_offset;
        self.pause_offset = 0;
        self.paused_at = None;
    }

    pub fn set_pause(&mut self, paused: bool, frame: u64) -> Result<()> {
        if self.is_paused() == paused {
            return Err(BeeError::NotApplicable(format!(
                "timeline \"{}\" is already {}",
                self.name,
                if paused { "paused" } else { "unpaused" }
            )));
        }
        match self.paused_at.take() {
            Some(at) => self.pause_offset += frame.saturating_sub(at),
            None => self.paused_at = Some(frame),
        }
        Ok(())
    }

    /// Advance to the absolute `frame`, collecting every action that came
    /// due since the previous step.
    pub fn step_to(&mut self, frame: u64) -> Result<TimelineStep<A>> {
        let Some(started_at) = self.started_at.filter(|_| self.paused_at.is_none()) else {
            return Err(BeeError::NotApplicable(format!(
                "timeline \"{}\" is not running",
                self.name
            )));
        };

        self.position = (frame.saturating_sub(started_at) + self.start_offset)
            .saturating_sub(self.pause_offset);

        let mut fired = Vec::new();
        if self.position >= self.next_frame {
            for list in self.actions.range(self.next_frame..=self.position).map(|(_, l)| l) {
                fired.extend(list.iter().map(|(_, a)| a.clone()));
            }
            self.next_frame = self.position + 1;
        }

        let finished = self
            .actions
            .keys()
            .next_back()
            .map_or(true, |&last| last < self.next_frame);
        if finished {
            self.started_at = None;
        }
        Ok(TimelineStep { fired, finished })
    }

    /// Stop and hand back the end action, if any
    pub fn end(&mut self) -> Option<A> {
        self.started_at = None;
        self.pause_offset = 0;
        self.paused_at = None;
        self.end_action.clone()
    }

    /// Human-readable listing of the actions
    pub fn action_table(&self) -> String {
        if self.actions.is_empty() {
            return "none\n".to_string();
        }
        let mut table = String::from("(frame, name)\n");
        for (frame, list) in &self.actions {
            for (name, _) in list {
                let _ = writeln!(table, "({frame}, {name})");
            }
        }
        table
    }
}
