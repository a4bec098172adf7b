//! Gate angle parameters.
//!
//! An angle is either a concrete value in radians or a linear function
//! `scale * symbol + shift` of a named symbol. Symbols are bound when a
//! circuit is executed, which lets a variational loop reuse one circuit
//! across iterations.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{IrError, IrResult};

/// A concrete or symbolic angle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Parameter {
    /// A concrete angle in radians.
    Value(f64),
    /// `scale * name + shift`.
    Symbol {
        /// Symbol name.
        name: String,
        /// Multiplier applied to the bound value.
        scale: f64,
        /// Offset added after scaling.
        shift: f64,
    },
}

impl Parameter {
    /// Create a concrete parameter.
    pub fn value(value: f64) -> Self {
        Parameter::Value(value)
    }

    /// Create a symbolic parameter with unit scale and no shift.
    pub fn symbol(name: impl Into<String>) -> Self {
        Parameter::Symbol {
            name: name.into(),
            scale: 1.0,
            shift: 0.0,
        }
    }

    /// Multiply the parameter by a constant.
    #[must_use]
    pub fn scaled(self, factor: f64) -> Self {
        match self {
            Parameter::Value(v) => Parameter::Value(v * factor),
            Parameter::Symbol { name, scale, shift } => Parameter::Symbol {
                name,
                scale: scale * factor,
                shift: shift * factor,
            },
        }
    }

    /// Add a constant to the parameter.
    #[must_use]
    pub fn shifted(self, offset: f64) -> Self {
        match self {
            Parameter::Value(v) => Parameter::Value(v + offset),
            Parameter::Symbol { name, scale, shift } => Parameter::Symbol {
                name,
                scale,
                shift: shift + offset,
            },
        }
    }

    /// Check if this parameter still references a symbol.
    pub fn is_symbolic(&self) -> bool {
        matches!(self, Parameter::Symbol { .. })
    }

    /// The symbol name, if any.
    pub fn symbol_name(&self) -> Option<&str> {
        match self {
            Parameter::Value(_) => None,
            Parameter::Symbol { name, .. } => Some(name),
        }
    }

    /// The concrete value, if the parameter is not symbolic.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Parameter::Value(v) => Some(*v),
            Parameter::Symbol { .. } => None,
        }
    }

    /// Resolve the parameter against a set of bindings.
    pub fn resolve(&self, bindings: &FxHashMap<String, f64>) -> IrResult<f64> {
        let value = match self {
            Parameter::Value(v) => *v,
            Parameter::Symbol { name, scale, shift } => {
                let bound = bindings
                    .get(name)
                    .ok_or_else(|| IrError::UnboundParameter(name.clone()))?;
                scale * bound + shift
            }
        };
        if !value.is_finite() {
            return Err(IrError::NonFiniteParameter(self.to_string()));
        }
        Ok(value)
    }

    /// Bind the symbol if present in `bindings`, otherwise leave it symbolic.
    pub fn bind(&self, bindings: &FxHashMap<String, f64>) -> Self {
        match self {
            Parameter::Symbol { name, scale, shift } => match bindings.get(name) {
                Some(v) => Parameter::Value(scale * v + shift),
                None => self.clone(),
            },
            Parameter::Value(_) => self.clone(),
        }
    }
}

impl From<f64> for Parameter {
    fn from(value: f64) -> Self {
        Parameter::Value(value)
    }
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Parameter::Value(v) => write!(f, "{v}"),
            Parameter::Symbol { name, scale, shift } => {
                if *scale == 1.0 {
                    write!(f, "{name}")?;
                } else {
                    write!(f, "{scale}*{name}")?;
                }
                if *shift != 0.0 {
                    write!(f, "{shift:+}")?;
                }
                Ok(())
            }
        }
    }
}
