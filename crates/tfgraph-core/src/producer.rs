//! Opaque handles to whatever supplies a dynamic transform at runtime.

use std::fmt;
use std::sync::Arc;

/// Identity-only reference to a runtime transform producer (a component, a
/// port, a driver...).  The graph never asks anything of a producer beyond
/// equality; cloning shares the underlying name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Producer(Arc<str>);

impl Producer {
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        Self(name.into())
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Producer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Producer {
    fn from(name: &str) -> Self {
        Producer::new(name)
    }
}

impl From<String> for Producer {
    fn from(name: String) -> Self {
        Producer::new(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn producers_compare_by_name() {
        assert_eq!(Producer::new("dynamixel"), Producer::from("dynamixel"));
        assert_ne!(Producer::new("dynamixel"), Producer::new("imu"));
    }

    #[test]
    fn clone_shares_the_name() {
        let p = Producer::new("arm_joint_states");
        let q = p.clone();
        assert!(std::ptr::eq(p.name(), q.name()));
        assert_eq!(q.to_string(), "arm_joint_states");
    }
}
