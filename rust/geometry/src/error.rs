// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use thiserror::Error;

/// Result type for geometry operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while constructing or evaluating geometry
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid curve: {0}")]
    InvalidCurve(String),

    #[error("Loop is not closed: curve {0} does not connect to curve {1}")]
    OpenLoop(usize, usize),

    #[error("Degenerate loop: {0}")]
    DegenerateLoop(String),

    #[error("Invalid polygon: {0}")]
    InvalidPolygon(String),
}
