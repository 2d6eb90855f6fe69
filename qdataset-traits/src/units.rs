use std::fmt;
use std::sync::Arc;

/// Opaque units handle.
///
/// Units are compared by name only; conversion between units belongs to
/// an external collaborator.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Units(Arc<str>);

impl Units {
    pub fn new(name: &str) -> Self {
        Units(Arc::from(name))
    }

    /// The empty unit of plain numbers.
    pub fn dimensionless() -> Self {
        Units::new("")
    }

    pub fn name(&self) -> &str {
        &self.0
    }

    pub fn is_dimensionless(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Units {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Units({:?})", &*self.0)
    }
}

impl fmt::Display for Units {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Units {
    fn from(name: &str) -> Self {
        Units::new(name)
    }
}
