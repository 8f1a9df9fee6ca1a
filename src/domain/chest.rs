/// Open/closed capability of block containers.
///
/// A block that doubles as a chest refuses to move while its lid is open.
/// Blocks without a lid use `Sealed`, which is never open.

use std::fmt;

pub trait Openable: fmt::Debug {
    fn is_open(&self) -> bool;
    fn open(&mut self);
    fn close(&mut self);
}

/// A lidded container. Closed when built.
#[derive(Clone, Debug, Default)]
pub struct Chest {
    open: bool,
}

impl Chest {
    pub fn new() -> Self {
        Chest::default()
    }
}

impl Openable for Chest {
    fn is_open(&self) -> bool {
        self.open
    }

    fn open(&mut self) {
        self.open = true;
    }

    fn close(&mut self) {
        self.open = false;
    }
}

/// Lidless block body: opening is ignored.
#[derive(Clone, Copy, Debug, Default)]
pub struct Sealed;

impl Openable for Sealed {
    fn is_open(&self) -> bool {
        false
    }

    fn open(&mut self) {}

    fn close(&mut self) {}
}
