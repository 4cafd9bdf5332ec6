//! Fixed registry of integrable functions.
//!
//! The set is closed: three single-argument real functions addressed by a
//! stable index. Entries are plain function pointers, so they can be shared
//! across threads without synchronization.

use std::f64::consts::PI;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{EngineError, EngineResult};

/// Number of registered functions.
pub const NUM_FUNCS: usize = 3;

/// Signature of every registered function.
pub type MathFn = fn(f64) -> f64;

/// Validated index into the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "usize", into = "usize")]
pub struct FunctionId(usize);

impl FunctionId {
    pub fn new(index: usize) -> EngineResult<Self> {
        if index < NUM_FUNCS {
            Ok(FunctionId(index))
        } else {
            Err(EngineError::InvalidFunctionIndex(index))
        }
    }

    pub fn index(self) -> usize {
        self.0
    }

    /// The registry entry this id points at. Never fails for a constructed id.
    pub fn function(self) -> RegisteredFunction {
        FUNCS[self.0]
    }
}

impl TryFrom<usize> for FunctionId {
    type Error = EngineError;

    fn try_from(index: usize) -> Result<Self, Self::Error> {
        FunctionId::new(index)
    }
}

impl From<FunctionId> for usize {
    fn from(id: FunctionId) -> usize {
        id.0
    }
}

impl fmt::Display for FunctionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A named, pure `f64 -> f64` mapping.
#[derive(Clone, Copy)]
pub struct RegisteredFunction {
    pub name: &'static str,
    func: MathFn,
}

impl RegisteredFunction {
    pub fn eval(&self, x: f64) -> f64 {
        (self.func)(x)
    }
}

impl fmt::Debug for RegisteredFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisteredFunction").field("name", &self.name).finish()
    }
}

pub fn sine(x: f64) -> f64 {
    x.sin()
}

/// Standard normal probability density.
pub fn gaussian(x: f64) -> f64 {
    (-(x * x) / 2.0).exp() / (2.0 * PI).sqrt()
}

/// Charge curve that ramps up on `[0, 1)` and decays afterwards.
pub fn charge_decay(x: f64) -> f64 {
    if x < 0.0 {
        0.0
    } else if x < 1.0 {
        1.0 - (-5.0 * x).exp()
    } else {
        (-(x - 1.0)).exp()
    }
}

static FUNCS: [RegisteredFunction; NUM_FUNCS] = [
    RegisteredFunction { name: "sine", func: sine },
    RegisteredFunction { name: "gaussian", func: gaussian },
    RegisteredFunction { name: "charge_decay", func: charge_decay },
];

/// Look up a function by raw index.
///
/// # Errors
/// Returns `EngineError::OutOfRange` for negative ids and ids `>= NUM_FUNCS`.
pub fn lookup(id: i64) -> EngineResult<RegisteredFunction> {
    usize::try_from(id)
        .ok()
        .and_then(|i| FUNCS.get(i))
        .copied()
        .ok_or(EngineError::OutOfRange(id))
}

/// All entries with their ids, in index order.
pub fn entries() -> impl Iterator<Item = (FunctionId, RegisteredFunction)> {
    FUNCS.iter().enumerate().map(|(i, f)| (FunctionId(i), *f))
}
