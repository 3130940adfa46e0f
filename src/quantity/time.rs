use std::fmt::{Debug, Display, Formatter};

use crate::quantity::Quantity;

pub type Hours = Quantity<0, 1, 0>;

impl Hours {
    pub const ONE: Self = Self(1.0);
}

impl Display for Hours {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} h", self.0)
    }
}

impl Debug for Hours {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}h", self.0)
    }
}
