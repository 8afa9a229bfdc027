// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! GPIO lines exposed as a directory holding `direction` and `value`.

use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::Backend;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GpioLine {
    path: PathBuf,
}

impl GpioLine {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Makes the line an output and drives it.  Direction is always set
    /// before value.
    pub fn set_output(
        &self,
        backend: &mut dyn Backend,
        high: bool,
    ) -> Result<()> {
        let value = if high { "1" } else { "0" };

        backend
            .write(&self.path.join("direction"), "out")
            .and_then(|()| backend.write(&self.path.join("value"), value))
            .with_context(|| {
                format!("failed to drive {} to {}", self.path.display(), value)
            })
    }
}
