//! Penalty records

use serde::{Deserialize, Serialize};
use std::fmt;

/// How a penalty is discharged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PenaltyClass {
    /// Served by a pass through the pit lane
    Immediate,
    /// Applied as a time adjustment after the race
    Deferred,
}

/// Why a penalty was issued.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PenaltyReason {
    IllegalDrs { zone: usize },
    DrsWithoutDetection,
    IncorrectStartingTyre,
    InsufficientCompounds { required: u32 },
    IllegalRefuel,
}

impl fmt::Display for PenaltyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PenaltyReason::IllegalDrs { zone } => write!(f, "Illegal DRS use, Zone {}", zone),
            PenaltyReason::DrsWithoutDetection => f.write_str(
                "Illegal DRS use, DRS opened without crossing detection line (Start or backToPit)",
            ),
            PenaltyReason::IncorrectStartingTyre => {
                f.write_str("Incorrect starting tyre. (POST RACE)")
            }
            PenaltyReason::InsufficientCompounds { required } => {
                write!(f, "Driver did not use {} compounds. (POST RACE)", required)
            }
            PenaltyReason::IllegalRefuel => f.write_str("Driver refuelled (POST RACE)"),
        }
    }
}

/// A single penalty held by the ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Penalty {
    pub lap: u32,
    pub driver: String,
    pub reason: PenaltyReason,
    pub detail: String,
    pub class: PenaltyClass,
    /// Set when an Immediate penalty was still pending at race end
    pub unserved: bool,
}

impl Penalty {
    pub fn new(lap: u32, driver: impl Into<String>, reason: PenaltyReason, class: PenaltyClass) -> Self {
        let detail = reason.to_string();
        Self { lap, driver: driver.into(), reason, detail, class, unserved: false }
    }

    pub fn immediate(lap: u32, driver: impl Into<String>, reason: PenaltyReason) -> Self {
        Self::new(lap, driver, reason, PenaltyClass::Immediate)
    }

    pub fn deferred(lap: u32, driver: impl Into<String>, reason: PenaltyReason) -> Self {
        Self::new(lap, driver, reason, PenaltyClass::Deferred)
    }

    /// Convert a pending Immediate penalty into a post-race one.
    pub fn into_unserved(mut self) -> Self {
        self.detail = format!("UNSERVED {} (POST RACE)", self.detail);
        self.class = PenaltyClass::Deferred;
        self.unserved = true;
        self
    }
}
