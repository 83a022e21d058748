//! # filmscreen-adapter-virtual
//!
//! Virtual CVM controller implementing the `ConnectionClient` port entirely
//! in memory, for tests and demonstration.
//!
//! ## Simulated behaviour
//!
//! | Command | Response (per addressed motor) |
//! |---------|--------------------------------|
//! | any | the command is echoed back first |
//! | `Up` | `Retracting`, positions down to `0`, `Home` |
//! | `Down` | `Extending`, positions up to `100`, `End` |
//! | `Stop` | `Stop` |
//! | `Query(Position)` / `Query(Status)` | current position / resting status |
//! | `Store(n)` | remembers the addressed motors' positions |
//! | `Recall(n)` | moves every stored motor back to its preset position |
//!
//! Commands addressed to `ALL` apply to motors `A`..`D`.
//!
//! ## Dependency rule
//!
//! Depends on `filmscreen-app` (port traits) and `filmscreen-domain` only.

mod config;
mod error;
mod motor;

pub use config::VirtualConfig;
pub use error::VirtualError;
pub use motor::SimulatedMotor;

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use filmscreen_app::ports::{ConnectionClient, InboundSender, Subscription, inbound_channel};
use filmscreen_domain::error::ClientError;
use filmscreen_domain::protocol::{Command, Event, Message, Motor, Payload, QueryKind, Status};

/// Credentials presented by the client when connecting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

#[derive(Default)]
struct Inner {
    connected: bool,
    inbound: Option<InboundSender>,
    motors: HashMap<Motor, SimulatedMotor>,
    presets: HashMap<u32, HashMap<Motor, f64>>,
    sent: Vec<Message>,
}

/// In-memory CVM controller.
pub struct VirtualCvm {
    config: VirtualConfig,
    offered: Credentials,
    inner: Mutex<Inner>,
}

impl VirtualCvm {
    /// Simulate a controller configured by `config`, reached with `offered`
    /// credentials.
    #[must_use]
    pub fn new(config: VirtualConfig, offered: Credentials) -> Self {
        let inner = Inner {
            motors: Motor::PHYSICAL
                .iter()
                .map(|&motor| (motor, SimulatedMotor::default()))
                .collect(),
            ..Inner::default()
        };
        Self {
            config,
            offered,
            inner: Mutex::new(inner),
        }
    }

    /// Deliver an arbitrary device message to the current subscriber,
    /// waiting until it has room.
    ///
    /// Returns `false` if nobody is subscribed.
    pub async fn inject(&self, message: Message) -> bool {
        let tx = self.lock().inbound.clone();
        match tx {
            Some(tx) => tx.deliver(message).await,
            None => false,
        }
    }

    /// Every command received so far, in order.
    #[must_use]
    pub fn sent(&self) -> Vec<Message> {
        self.lock().sent.clone()
    }

    /// Current extension of a physical motor.
    #[must_use]
    pub fn extension(&self, motor: Motor) -> Option<f64> {
        self.lock().motors.get(&motor).map(SimulatedMotor::extension)
    }

    /// Move a motor without reporting it, as if it was moved by hand.
    pub fn set_extension(&self, motor: Motor, extension: f64) {
        if let Some(m) = self.lock().motors.get_mut(&motor) {
            m.set_extension(extension);
        }
    }

    /// Simulate the device dropping the link.
    pub fn drop_link(&self) {
        self.lock().connected = false;
        tracing::debug!("virtual CVM dropped the link");
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn accepts(&self) -> bool {
        self.offered.username == self.config.username
            && self.offered.password == self.config.password
    }

    fn respond(&self, inner: &mut Inner, motor: Motor, command: Command) -> Vec<Message> {
        let steps = self.config.travel_steps;
        let targets: Vec<Motor> = match motor {
            Motor::All => Motor::PHYSICAL.to_vec(),
            one => vec![one],
        };
        let mut replies = vec![Message::command(motor, command)];

        match command {
            Command::Up | Command::Down | Command::Stop | Command::Query(_) => {
                for target in targets {
                    let Some(m) = inner.motors.get_mut(&target) else {
                        continue;
                    };
                    let events = match command {
                        Command::Up => m.retract(steps),
                        Command::Down => m.extend(steps),
                        Command::Query(QueryKind::Position) => vec![m.report_position()],
                        Command::Query(QueryKind::Status) => {
                            vec![Event::Status(m.resting_status())]
                        }
                        _ => vec![Event::Status(Status::Stop)],
                    };
                    replies.extend(events.into_iter().map(|e| Message::event(target, e)));
                }
            }
            Command::Store(number) => {
                let stored = inner.presets.entry(number).or_default();
                for target in targets {
                    if let Some(m) = inner.motors.get(&target) {
                        stored.insert(target, m.extension());
                    }
                }
                tracing::debug!(preset = number, "virtual CVM stored preset");
            }
            Command::Recall(number) => {
                let Some(preset) = inner.presets.get(&number).cloned() else {
                    tracing::warn!(preset = number, "virtual CVM has no such preset");
                    return replies;
                };
                for target in Motor::PHYSICAL {
                    let (Some(&extension), Some(m)) =
                        (preset.get(&target), inner.motors.get_mut(&target))
                    else {
                        continue;
                    };
                    replies.extend(
                        m.travel(extension, steps)
                            .into_iter()
                            .map(|e| Message::event(target, e)),
                    );
                }
            }
        }
        replies
    }
}

impl ConnectionClient for VirtualCvm {
    async fn connect(&self) -> Result<bool, ClientError> {
        if !self.config.reachable {
            return Err(VirtualError::Refused.into());
        }
        let accepted = self.accepts();
        self.lock().connected = accepted;
        tracing::debug!(accepted, "virtual CVM login");
        Ok(accepted)
    }

    async fn send(&self, message: Message) -> Result<(), ClientError> {
        let (replies, inbound) = {
            let mut inner = self.lock();
            if !inner.connected {
                return Err(VirtualError::NotConnected.into());
            }
            let Payload::Command(command) = &message.payload else {
                return Err(VirtualError::NotACommand.into());
            };
            inner.sent.push(message.clone());
            let replies = self.respond(&mut inner, message.motor, *command);
            (replies, inner.inbound.clone())
        };

        if let Some(tx) = inbound {
            for reply in replies {
                if !tx.deliver(reply).await {
                    tracing::trace!("virtual CVM subscriber gone");
                    break;
                }
            }
        }
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.lock().connected
    }

    fn close(&self) {
        self.lock().connected = false;
    }

    fn subscribe(&self) -> Subscription {
        let (tx, subscription) = inbound_channel();
        self.lock().inbound = Some(tx);
        subscription
    }

    fn unsubscribe(&self) {
        self.lock().inbound = None;
    }
}
