//! Simulated screen motor.
//!
//! Moves are instantaneous: a move produces the full sequence of events a
//! real motor would report (direction, intermediate positions, terminal
//! status) in one go.

use filmscreen_domain::protocol::{Event, Status};

const HOME: f64 = 0.0;
const END: f64 = 100.0;

/// One motor's percent extension.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SimulatedMotor {
    extension: f64,
}

impl SimulatedMotor {
    #[must_use]
    pub fn extension(&self) -> f64 {
        self.extension
    }

    pub fn set_extension(&mut self, extension: f64) {
        self.extension = extension.clamp(HOME, END);
    }

    /// Drive the motor fully up.
    pub fn retract(&mut self, steps: u8) -> Vec<Event> {
        self.travel(HOME, steps)
    }

    /// Drive the motor fully down.
    pub fn extend(&mut self, steps: u8) -> Vec<Event> {
        self.travel(END, steps)
    }

    /// Move to `target`, reporting progress over `steps` position events.
    #[allow(clippy::float_cmp)]
    pub fn travel(&mut self, target: f64, steps: u8) -> Vec<Event> {
        let target = target.clamp(HOME, END);
        let start = self.extension;
        let mut events = Vec::new();

        if target > start {
            events.push(Event::Status(Status::Extending));
        } else if target < start {
            events.push(Event::Status(Status::Retracting));
        }

        if target != start {
            let steps = steps.max(1);
            for step in 1..steps {
                let progress = f64::from(step) / f64::from(steps);
                let reading = start + (target - start) * progress;
                events.push(position((reading * 10.0).round() / 10.0));
            }
            events.push(position(target));
        }

        self.extension = target;
        events.push(Event::Status(self.resting_status()));
        events
    }

    #[must_use]
    pub fn report_position(&self) -> Event {
        position(self.extension)
    }

    /// Status of a motor that is not moving.
    #[must_use]
    pub fn resting_status(&self) -> Status {
        if self.extension <= HOME {
            Status::Home
        } else if self.extension >= END {
            Status::End
        } else {
            Status::Stop
        }
    }
}

fn position(extension: f64) -> Event {
    Event::Position(format!("{extension}"))
}
