//! Head movement rules.
//!
//! Heads are plain `(space, position)` values; everything that moves one
//! takes the current length of the referenced space so positions can be
//! re-validated after the space grows or shrinks.

use protocell_data::Head;

pub trait HeadLogic {
    /// Brings the position back inside a space of `len` lines. Positions past
    /// the end wrap; an empty space pins the head to 0.
    fn adjust(&mut self, len: usize);
    /// Moves one line forward, wrapping at the end.
    fn advance(&mut self, len: usize);
    /// Moves by a signed offset. Moving before the start clamps to 0.
    fn jump(&mut self, offset: i64, len: usize);
    /// Sets an absolute position; negative values clamp to 0.
    fn set_position(&mut self, position: i64, len: usize);
    /// The line after this one, without moving. `None` on the last line;
    /// reading past the end never wraps to the start.
    fn following(self, len: usize) -> Option<Head>;
}

impl HeadLogic for Head {
    fn adjust(&mut self, len: usize) {
        if len == 0 {
            self.position = 0;
        } else if self.position() >= len {
            self.position = (self.position() % len) as u32;
        }
    }

    fn advance(&mut self, len: usize) {
        self.position = self.position.saturating_add(1);
        self.adjust(len);
    }

    fn jump(&mut self, offset: i64, len: usize) {
        self.set_position(i64::from(self.position) + offset, len);
    }

    fn set_position(&mut self, position: i64, len: usize) {
        self.position = position.clamp(0, i64::from(u32::MAX)) as u32;
        self.adjust(len);
    }

    fn following(self, len: usize) -> Option<Head> {
        let next = self.position() + 1;
        (next < len).then(|| Head::new(self.space(), next))
    }
}
