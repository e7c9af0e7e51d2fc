//! Capability flags
//!
//! Hosts decide what a program may reach: file/TCP I/O, the string library,
//! and debug-only builtins. The VM checks these gates at dispatch time and
//! raises a VM error when a closed gate is hit, so a sandboxed embedding
//! never performs I/O no matter what bytecode it is handed.
//!
//! The record is serde-enabled so hosts can carry it inside their own
//! project manifests.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flags {
    /// Gates `read_file`, `write_file`, and all `tcp_*` builtins
    #[serde(default)]
    pub io_enabled: bool,
    /// Gates `str_split`
    #[serde(default)]
    pub std_lib_enabled: bool,
    /// Gates `__stack_depth__`
    #[serde(default)]
    pub expose_debug_builtins: bool,
}

impl Flags {
    pub fn new() -> Flags {
        Flags::default()
    }

    pub fn with_io(mut self) -> Flags {
        self.io_enabled = true;
        self
    }

    pub fn with_std_lib(mut self) -> Flags {
        self.std_lib_enabled = true;
        self
    }

    pub fn with_debug_builtins(mut self) -> Flags {
        self.expose_debug_builtins = true;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_closed() {
        let flags = Flags::new();
        assert!(!flags.io_enabled);
        assert!(!flags.std_lib_enabled);
        assert!(!flags.expose_debug_builtins);
    }

    #[test]
    fn test_builders() {
        let flags = Flags::new().with_io().with_std_lib();
        assert!(flags.io_enabled);
        assert!(flags.std_lib_enabled);
        assert!(!flags.expose_debug_builtins);
    }
}
