//! Shader sub-program lookup
//!
//! Materials are authored and compiled by the host. Passes only need to turn
//! sub-program names into stable indices once, at construction time, and
//! fail if a name is missing.

use std::fmt;

/// Index of a named sub-program inside a material.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShaderPassIndex(pub u32);

impl ShaderPassIndex {
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for ShaderPassIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ShaderPass#{}", self.0)
    }
}

/// A material that exposes sub-programs by name.
pub trait ShaderPassLookup {
    /// Material name (diagnostics only).
    fn name(&self) -> &str;

    /// Index of the sub-program called `pass_name`, if present.
    fn find_pass(&self, pass_name: &str) -> Option<ShaderPassIndex>;
}

/// Name list backed lookup, for hosts that only need to validate a material
/// layout before the real shaders exist.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PassNames {
    name: String,
    passes: Vec<String>,
}

impl PassNames {
    #[must_use]
    pub fn new<I, S>(name: impl Into<String>, passes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            passes: passes.into_iter().map(Into::into).collect(),
        }
    }
}

impl ShaderPassLookup for PassNames {
    fn name(&self) -> &str {
        &self.name
    }

    fn find_pass(&self, pass_name: &str) -> Option<ShaderPassIndex> {
        self.passes
            .iter()
            .position(|p| p == pass_name)
            .map(|i| ShaderPassIndex(i as u32))
    }
}
