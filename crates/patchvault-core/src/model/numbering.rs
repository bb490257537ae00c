//! Bank, program and channel numbers
//!
//! Values are stored zero-based, the way they travel on the wire. The
//! one-based form is only produced for display and only parsed from user
//! input; both directions are exact inverses.

use crate::errors::{PatchVaultError, Result};
use serde::{Deserialize, Serialize};

/// Zero-based bank number
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BankNumber(u32);

impl BankNumber {
    pub fn from_zero_based(bank: u32) -> Self {
        Self(bank)
    }

    /// Parse a one-based bank number as shown to users
    ///
    /// # Errors
    ///
    /// Returns `InvalidNumber` for 0 or a number past the zero-based range.
    pub fn from_one_based(bank: u64) -> Result<Self> {
        zero_based_of("bank", bank).map(Self)
    }

    pub fn to_zero_based(self) -> u32 {
        self.0
    }

    /// One wider than the wire type, so the last bank still has a number
    pub fn to_one_based(self) -> u64 {
        u64::from(self.0) + 1
    }
}

impl std::fmt::Display for BankNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_one_based())
    }
}

/// Zero-based program number, optionally qualified by its bank
///
/// Without a bank the number is a flat index across all banks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProgramNumber {
    program: u32,
    bank: Option<BankNumber>,
}

impl ProgramNumber {
    pub fn from_zero_based(program: u32) -> Self {
        Self {
            program,
            bank: None,
        }
    }

    /// # Errors
    ///
    /// Returns `InvalidNumber` for 0.
    pub fn from_one_based(program: u64) -> Result<Self> {
        zero_based_of("program", program).map(Self::from_zero_based)
    }

    /// Program `program` (zero-based) inside `bank`
    pub fn in_bank(bank: BankNumber, program: u32) -> Self {
        Self {
            program,
            bank: Some(bank),
        }
    }

    /// Split a flat program index into bank and program-in-bank
    ///
    /// # Errors
    ///
    /// Returns `InvalidNumber` when `patches_per_bank` is 0.
    pub fn from_flat(flat: u32, patches_per_bank: u32) -> Result<Self> {
        if patches_per_bank == 0 {
            return Err(PatchVaultError::InvalidNumber {
                kind: "bank size",
                value: 0,
            });
        }
        Ok(Self::in_bank(
            BankNumber::from_zero_based(flat / patches_per_bank),
            flat % patches_per_bank,
        ))
    }

    /// Flat zero-based index across all banks; `None` past `u32::MAX`
    pub fn to_flat(self, patches_per_bank: u32) -> Option<u32> {
        match self.bank {
            Some(bank) => bank
                .to_zero_based()
                .checked_mul(patches_per_bank)?
                .checked_add(self.program),
            None => Some(self.program),
        }
    }

    pub fn bank(self) -> Option<BankNumber> {
        self.bank
    }

    pub fn to_zero_based(self) -> u32 {
        self.program
    }

    pub fn to_one_based(self) -> u64 {
        u64::from(self.program) + 1
    }
}

fn zero_based_of(kind: &'static str, one_based: u64) -> Result<u32> {
    one_based
        .checked_sub(1)
        .and_then(|n| u32::try_from(n).ok())
        .ok_or(PatchVaultError::InvalidNumber {
            kind,
            value: i64::try_from(one_based).unwrap_or(i64::MAX),
        })
}

impl std::fmt::Display for ProgramNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.bank {
            Some(bank) => write!(f, "{}-{:03}", bank, self.to_one_based()),
            None => write!(f, "{:03}", self.to_one_based()),
        }
    }
}

/// MIDI channel, 0..=15 on the wire
///
/// An invalid channel is modelled as `Option::None` by the caller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MidiChannel(u8);

impl MidiChannel {
    pub fn from_zero_based(channel: u8) -> Option<Self> {
        (channel < 16).then_some(Self(channel))
    }

    pub fn from_one_based(channel: u8) -> Option<Self> {
        (1..=16).contains(&channel).then(|| Self(channel - 1))
    }

    pub fn to_zero_based(self) -> u8 {
        self.0
    }

    pub fn to_one_based(self) -> u8 {
        self.0 + 1
    }
}

impl std::fmt::Display for MidiChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_one_based())
    }
}
