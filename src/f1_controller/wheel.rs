/// Rotation reported by the selector wheel between two frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Clockwise,
    CounterClockwise,
    None,
}

/// Remembers the last wheel counter so the next sample yields a direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WheelSample {
    last: Option<u8>,
}

impl WheelSample {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `position` and return how the wheel moved since the previous
    /// call. The first call after construction is always [`Direction::None`].
    pub fn update(&mut self, position: u8) -> Direction {
        let previous = self.last.replace(position);
        match previous {
            None => Direction::None,
            Some(prev) => match position.wrapping_sub(prev) as i8 {
                0 => Direction::None,
                d if d > 0 => Direction::Clockwise,
                _ => Direction::CounterClockwise,
            },
        }
    }
}
