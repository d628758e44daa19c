//! The workspace-mode modal keyboard state machine: `goto`/`move`/`project`
//! modes entered via a compositor keybinding, accumulating digits (or, once
//! `:` is pressed, a project-name filter) until `execute` or `cancel`.

use std::collections::VecDeque;

use i3pm_types::{InputType, ModeType, WorkspaceModeState, WorkspaceSwitch};
use tokio::sync::RwLock;

use crate::error::{Error, Result};

pub struct WorkspaceModeMachine {
    state: RwLock<WorkspaceModeState>,
    history: RwLock<VecDeque<WorkspaceSwitch>>,
    history_capacity: usize,
}

impl WorkspaceModeMachine {
    #[must_use]
    pub fn new(history_capacity: usize) -> Self {
        Self {
            state: RwLock::new(WorkspaceModeState::default()),
            history: RwLock::new(VecDeque::with_capacity(history_capacity)),
            history_capacity,
        }
    }

    /// Enters a mode, resetting any previously-accumulated input.
    pub async fn enter(&self, mode_type: ModeType, output_cache: Option<String>, now: f64) {
        let mut state = self.state.write().await;
        *state = WorkspaceModeState {
            active: true,
            mode_type,
            accumulated: String::new(),
            input_type: InputType::Digit,
            entered_at: now,
            output_cache,
        };
    }

    /// Appends a digit. Once a `:` has switched input to project-filter
    /// mode, digits are treated as ordinary filter characters rather than
    /// workspace-number digits — they never switch back to `Digit` input.
    ///
    /// # Errors
    ///
    /// Returns [`Error::State`] if no mode is currently active.
    pub async fn input_digit(&self, digit: char) -> Result<()> {
        self.require_active().await?;
        let mut state = self.state.write().await;
        state.accumulated.push(digit);
        Ok(())
    }

    /// Switches input to project-filter mode. All subsequent input
    /// (digits included) is appended to the project-name filter until the
    /// mode is exited; there is no way back to digit input within the same
    /// mode activation.
    ///
    /// # Errors
    ///
    /// Returns [`Error::State`] if no mode is currently active.
    pub async fn input_colon(&self) -> Result<()> {
        self.require_active().await?;
        let mut state = self.state.write().await;
        state.input_type = InputType::Project;
        state.accumulated = ":".to_string();
        Ok(())
    }

    /// Appends a non-digit character (only meaningful once in project-filter
    /// input mode; callers should route digits through [`input_digit`] up
    /// until the first `:`).
    ///
    /// # Errors
    ///
    /// Returns [`Error::State`] if no mode is currently active.
    pub async fn input_char(&self, c: char) -> Result<()> {
        self.require_active().await?;
        self.state.write().await.accumulated.push(c);
        Ok(())
    }

    /// Removes the last accumulated character, if any.
    pub async fn backspace(&self) {
        let mut state = self.state.write().await;
        state.accumulated.pop();
    }

    /// Exits the mode without recording anything, discarding accumulated input.
    pub async fn cancel(&self) {
        let mut state = self.state.write().await;
        *state = WorkspaceModeState::default();
    }

    /// Exits the mode, returning the accumulated input for the caller to
    /// act on (resolve a workspace number or project filter and perform the
    /// actual switch/move).
    ///
    /// # Errors
    ///
    /// Returns [`Error::State`] if no mode is currently active.
    pub async fn execute(&self) -> Result<WorkspaceModeState> {
        self.require_active().await?;
        let mut state = self.state.write().await;
        let result = state.clone();
        *state = WorkspaceModeState::default();
        Ok(result)
    }

    pub async fn state(&self) -> WorkspaceModeState {
        self.state.read().await.clone()
    }

    pub async fn record_switch(&self, switch: WorkspaceSwitch) {
        let mut history = self.history.write().await;
        if history.len() >= self.history_capacity {
            history.pop_front();
        }
        history.push_back(switch);
    }

    pub async fn history(&self, limit: usize) -> Vec<WorkspaceSwitch> {
        self.history.read().await.iter().rev().take(limit).cloned().collect()
    }

    async fn require_active(&self) -> Result<()> {
        if self.state.read().await.active {
            Ok(())
        } else {
            Err(Error::State("workspace mode is not active".to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn digit_input_accumulates_in_order() {
        let machine = WorkspaceModeMachine::new(10);
        machine.enter(ModeType::Goto, None, 0.0).await;
        machine.input_digit('1').await.unwrap();
        machine.input_digit('2').await.unwrap();
        assert_eq!(machine.state().await.accumulated, "12");
    }

    #[tokio::test]
    async fn colon_switches_to_project_input_and_seeds_accumulated_with_colon() {
        let machine = WorkspaceModeMachine::new(10);
        machine.enter(ModeType::Goto, None, 0.0).await;
        machine.input_digit('1').await.unwrap();
        machine.input_colon().await.unwrap();
        assert_eq!(machine.state().await.accumulated, ":");
        assert_eq!(machine.state().await.input_type, InputType::Project);
    }

    #[tokio::test]
    async fn digits_after_colon_stay_in_project_filter() {
        let machine = WorkspaceModeMachine::new(10);
        machine.enter(ModeType::Goto, None, 0.0).await;
        machine.input_colon().await.unwrap();
        machine.input_char('n').await.unwrap();
        machine.input_digit('1').await.unwrap();
        let state = machine.state().await;
        assert_eq!(state.accumulated, ":n1");
        assert_eq!(state.input_type, InputType::Project);
    }

    #[tokio::test]
    async fn input_without_active_mode_errors() {
        let machine = WorkspaceModeMachine::new(10);
        assert!(machine.input_digit('1').await.is_err());
    }

    #[tokio::test]
    async fn cancel_resets_to_inactive_default() {
        let machine = WorkspaceModeMachine::new(10);
        machine.enter(ModeType::Move, None, 0.0).await;
        machine.input_digit('3').await.unwrap();
        machine.cancel().await;
        assert!(!machine.state().await.active);
        assert_eq!(machine.state().await.accumulated, "");
    }

    #[tokio::test]
    async fn execute_returns_accumulated_state_then_resets() {
        let machine = WorkspaceModeMachine::new(10);
        machine.enter(ModeType::Goto, None, 0.0).await;
        machine.input_digit('7').await.unwrap();
        let result = machine.execute().await.unwrap();
        assert_eq!(result.accumulated, "7");
        assert!(!machine.state().await.active);
    }

    #[tokio::test]
    async fn history_ring_drops_oldest_beyond_capacity() {
        let machine = WorkspaceModeMachine::new(2);
        for n in 1..=3u8 {
            machine
                .record_switch(WorkspaceSwitch {
                    workspace_num: n,
                    output_name: "eDP-1".into(),
                    timestamp: f64::from(n),
                    mode_type: ModeType::Goto,
                })
                .await;
        }
        let history = machine.history(10).await;
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].workspace_num, 3);
    }
}
