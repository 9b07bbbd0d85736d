#![warn(missing_docs)]

//! Error types for the lattice library.
//!
//! This module defines the errors that can occur when addressing points
//! of a lattice or building pulse sets against it.

use core::fmt;

/// Errors that can occur when addressing lattice points.
#[derive(Debug, Clone, PartialEq)]
pub enum LatticeError {
    /// Error for an index or coordinate outside the lattice.
    /// This variant is returned when a row, column or flat index does not
    /// address a point of the current preset.
    IndexOutOfBounds(&'static str),
    /// Error for a lattice with no points.
    /// This variant is returned when random indices are requested from an
    /// empty range.
    EmptyGrid(&'static str),
    /// Error for lattice dimensions that match no preset.
    /// This variant is returned when a layout is built or deserialized from
    /// raw rows, columns and spacing.
    UnknownPreset(&'static str),
}

impl fmt::Display for LatticeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LatticeError::IndexOutOfBounds(msg) => write!(f, "Lattice index out of bounds: {}", msg),
            LatticeError::EmptyGrid(msg) => write!(f, "Empty lattice: {}", msg),
            LatticeError::UnknownPreset(msg) => write!(f, "Unknown lattice preset: {}", msg),
        }
    }
}

impl core::error::Error for LatticeError {}
