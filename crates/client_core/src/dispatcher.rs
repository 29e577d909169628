//! Formation command submission and the transmission state it drives.

use shared::domain::{Formation, TransmissionState};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DispatchError {
    #[error("formation {in_flight} is still transmitting")]
    AlreadyTransmitting { in_flight: Formation },
    #[error("formation name must not be empty")]
    EmptyFormation,
}

/// Correlates a command completion with the submission that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CommandTicket(pub u64);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormationCommand {
    pub ticket: CommandTicket,
    pub formation: Formation,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    Completed,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettledCommand {
    pub formation: Formation,
    pub outcome: CommandOutcome,
}

#[derive(Debug, Clone, Default)]
pub struct FormationDispatcher {
    in_flight: Option<FormationCommand>,
    next_ticket: u64,
}

impl FormationDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> TransmissionState {
        if self.in_flight.is_some() {
            TransmissionState::Transmitting
        } else {
            TransmissionState::Idle
        }
    }

    pub fn in_flight(&self) -> Option<&FormationCommand> {
        self.in_flight.as_ref()
    }

    /// Moves to `Transmitting` and returns the command to send. Fails when
    /// a command is already in flight; nothing is queued.
    pub fn request(&mut self, formation: Formation) -> Result<FormationCommand, DispatchError> {
        if let Some(active) = &self.in_flight {
            return Err(DispatchError::AlreadyTransmitting {
                in_flight: active.formation.clone(),
            });
        }
        if formation.as_str().trim().is_empty() {
            return Err(DispatchError::EmptyFormation);
        }

        self.next_ticket += 1;
        let command = FormationCommand {
            ticket: CommandTicket(self.next_ticket),
            formation,
        };
        self.in_flight = Some(command.clone());
        Ok(command)
    }

    /// Returns to `Idle` for the matching in-flight command. Stale or
    /// duplicate completions yield `None`.
    pub fn settle(
        &mut self,
        ticket: CommandTicket,
        outcome: CommandOutcome,
    ) -> Option<SettledCommand> {
        if self.in_flight.as_ref().map(|command| command.ticket) != Some(ticket) {
            return None;
        }
        let command = self.in_flight.take()?;
        Some(SettledCommand {
            formation: command.formation,
            outcome,
        })
    }
}
