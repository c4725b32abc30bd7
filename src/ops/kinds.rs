//! Operator kinds of the message-passing kernels

use crate::error::Error;
use std::fmt;
use std::str::FromStr;

/// Binary operator applied per edge between the lhs and rhs operands
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    /// lhs + rhs
    Add,
    /// lhs - rhs
    Sub,
    /// lhs * rhs
    Mul,
    /// lhs / rhs
    Div,
    /// lhs (rhs is ignored)
    CopyLhs,
    /// rhs (lhs is ignored)
    CopyRhs,
    /// Inner product over the last feature axis
    Dot,
}

impl BinaryOp {
    /// Name as used in operator strings
    pub fn name(self) -> &'static str {
        match self {
            Self::Add => "add",
            Self::Sub => "sub",
            Self::Mul => "mul",
            Self::Div => "div",
            Self::CopyLhs => "copy_lhs",
            Self::CopyRhs => "copy_rhs",
            Self::Dot => "dot",
        }
    }

    /// Returns true if the result depends on the lhs operand
    #[inline]
    pub fn uses_lhs(self) -> bool {
        !matches!(self, Self::CopyRhs)
    }

    /// Returns true if the result depends on the rhs operand
    #[inline]
    pub fn uses_rhs(self) -> bool {
        !matches!(self, Self::CopyLhs)
    }
}

impl FromStr for BinaryOp {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "add" => Ok(Self::Add),
            "sub" => Ok(Self::Sub),
            "mul" => Ok(Self::Mul),
            "div" => Ok(Self::Div),
            "copy_lhs" | "copy_u" => Ok(Self::CopyLhs),
            "copy_rhs" | "copy_e" => Ok(Self::CopyRhs),
            "dot" => Ok(Self::Dot),
            other => Err(Error::invalid_argument(
                "op",
                format!("unknown binary operator '{}'", other),
            )),
        }
    }
}

/// Reduction over the edges entering a destination node
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ReduceOp {
    /// Sum of all messages
    Sum,
    /// Maximum message (records the winning edge)
    Max,
    /// Minimum message (records the winning edge)
    Min,
    /// Sum divided by in-degree
    Mean,
    /// No reduction: one message per edge
    None,
}

impl ReduceOp {
    /// Name as used in operator strings
    pub fn name(self) -> &'static str {
        match self {
            Self::Sum => "sum",
            Self::Max => "max",
            Self::Min => "min",
            Self::Mean => "mean",
            Self::None => "none",
        }
    }

    /// Returns true for reductions that keep argmax/argmin bookkeeping
    #[inline]
    pub fn records_arg(self) -> bool {
        matches!(self, Self::Max | Self::Min)
    }
}

impl FromStr for ReduceOp {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sum" => Ok(Self::Sum),
            "max" => Ok(Self::Max),
            "min" => Ok(Self::Min),
            "mean" => Ok(Self::Mean),
            "none" | "copy" => Ok(Self::None),
            other => Err(Error::invalid_argument(
                "reduce",
                format!("unknown reducer '{}'", other),
            )),
        }
    }
}

/// What a feature tensor's first axis is indexed by
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Target {
    /// Source node of the edge
    Src,
    /// Destination node of the edge
    Dst,
    /// The edge itself
    Edge,
}

impl FromStr for Target {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "src" | "u" => Ok(Self::Src),
            "dst" | "v" => Ok(Self::Dst),
            "edge" | "e" => Ok(Self::Edge),
            other => Err(Error::invalid_argument(
                "target",
                format!("unknown target '{}'", other),
            )),
        }
    }
}

impl Target {
    /// Select the id this target refers to for edge `eid` from `src` to `dst`
    #[inline]
    pub(crate) fn select(self, src: usize, dst: usize, eid: usize) -> usize {
        match self {
            Self::Src => src,
            Self::Dst => dst,
            Self::Edge => eid,
        }
    }
}

/// Which operand gradients a backward pass computes
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum GradTarget {
    /// Gradient of the lhs operand only
    Lhs,
    /// Gradient of the rhs operand only
    Rhs,
    /// Both gradients
    Both,
}

impl GradTarget {
    pub(crate) fn wants_lhs(self) -> bool {
        matches!(self, Self::Lhs | Self::Both)
    }

    pub(crate) fn wants_rhs(self) -> bool {
        matches!(self, Self::Rhs | Self::Both)
    }
}

impl FromStr for GradTarget {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "lhs" => Ok(Self::Lhs),
            "rhs" => Ok(Self::Rhs),
            "both" => Ok(Self::Both),
            other => Err(Error::invalid_argument(
                "grad_target",
                format!("unknown gradient target '{}'", other),
            )),
        }
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl fmt::Display for ReduceOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
