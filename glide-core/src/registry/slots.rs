//! Fixed capacity servo slot table
//!
//! Slots are filled first-fit. The highest occupied index is tracked so
//! batch operations only scan `0..=highest`, skipping empty slots left
//! behind by earlier detaches.
//!
//! Every slot carries a generation that is bumped when its servo is
//! removed. A [`ServoId`] only matches the generation it was issued for,
//! so a handle kept after detach never reaches a servo attached later in
//! the same slot.

use crate::motion::Servo;

/// Handle of an attached servo
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ServoId {
    index: u8,
    generation: u16,
}

impl ServoId {
    /// Slot index in the registry
    pub const fn index(self) -> usize {
        self.index as usize
    }

    /// Slot generation this handle was issued for
    pub const fn generation(self) -> u16 {
        self.generation
    }
}

/// Attach failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AttachError {
    /// Every slot is occupied
    RegistryFull,
    /// Calibration end points for 0 and 180 degree coincide
    InvalidCalibration,
}

/// Servo slots plus the "next requested position" of every slot
#[derive(Debug)]
pub struct ServoRegistry<const N: usize> {
    slots: [Option<Servo>; N],
    generations: [u16; N],
    next_positions: [i32; N],
    highest: Option<usize>,
}

impl<const N: usize> Default for ServoRegistry<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> ServoRegistry<N> {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            slots: core::array::from_fn(|_| None),
            generations: [0; N],
            next_positions: [0; N],
            highest: None,
        }
    }

    /// Number of slots
    pub const fn capacity(&self) -> usize {
        N
    }

    /// Number of occupied slots
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.highest.is_none()
    }

    /// Highest occupied slot index
    pub fn highest_index(&self) -> Option<usize> {
        self.highest
    }

    /// Put a servo into the first empty slot
    pub fn insert(&mut self, servo: Servo) -> Result<ServoId, AttachError> {
        let index = self
            .slots
            .iter()
            .position(Option::is_none)
            .ok_or(AttachError::RegistryFull)?;
        let slot = u8::try_from(index).map_err(|_| AttachError::RegistryFull)?;

        self.slots[index] = Some(servo);
        if self.highest.map_or(true, |highest| index > highest) {
            self.highest = Some(index);
        }
        Ok(ServoId {
            index: slot,
            generation: self.generations[index],
        })
    }

    /// Check if `id` still refers to an attached servo
    pub fn contains(&self, id: ServoId) -> bool {
        self.is_current(id) && self.slots[id.index()].is_some()
    }

    fn is_current(&self, id: ServoId) -> bool {
        self.generations.get(id.index()) == Some(&id.generation)
    }

    /// Take a servo out of its slot and retire the handle
    ///
    /// Returns None if the handle is stale or the slot already empty.
    pub fn remove(&mut self, id: ServoId) -> Option<Servo> {
        if !self.is_current(id) {
            return None;
        }
        let index = id.index();
        let servo = self.slots[index].take()?;
        self.generations[index] = self.generations[index].wrapping_add(1);
        self.shrink_highest();
        Some(servo)
    }

    fn shrink_highest(&mut self) {
        while let Some(highest) = self.highest {
            if self.slots[highest].is_some() {
                break;
            }
            self.highest = highest.checked_sub(1);
        }
    }

    pub fn get(&self, id: ServoId) -> Option<&Servo> {
        if !self.is_current(id) {
            return None;
        }
        self.slots[id.index()].as_ref()
    }

    pub fn get_mut(&mut self, id: ServoId) -> Option<&mut Servo> {
        if !self.is_current(id) {
            return None;
        }
        self.slots[id.index()].as_mut()
    }

    /// Last requested position of a servo (degree or microseconds)
    pub fn next_position(&self, id: ServoId) -> Option<i32> {
        if !self.contains(id) {
            return None;
        }
        Some(self.next_positions[id.index()])
    }

    /// Ignored for stale handles
    pub fn set_next_position(&mut self, id: ServoId, value: i32) {
        if self.contains(id) {
            self.next_positions[id.index()] = value;
        }
    }

    /// Fill the next position entries starting at slot 0
    ///
    /// Extra values beyond the capacity are ignored.
    pub fn set_next_positions(&mut self, values: &[i32]) {
        for (entry, value) in self.next_positions.iter_mut().zip(values) {
            *entry = *value;
        }
    }

    fn scan_len(&self) -> usize {
        self.highest.map_or(0, |highest| highest + 1)
    }

    /// Occupied slots
    pub fn iter(&self) -> impl Iterator<Item = (ServoId, &Servo)> {
        self.slots[..self.scan_len()]
            .iter()
            .zip(self.generations.iter())
            .enumerate()
            .filter_map(|(index, (slot, &generation))| {
                let id = ServoId {
                    index: index as u8,
                    generation,
                };
                slot.as_ref().map(|servo| (id, servo))
            })
    }

    /// Occupied slots, mutable
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (ServoId, &mut Servo)> {
        let len = self.scan_len();
        self.slots[..len]
            .iter_mut()
            .zip(self.generations.iter())
            .enumerate()
            .filter_map(|(index, (slot, &generation))| {
                let id = ServoId {
                    index: index as u8,
                    generation,
                };
                slot.as_mut().map(|servo| (id, servo))
            })
    }

    /// Occupied slots together with their next requested position
    pub fn iter_with_next_mut(&mut self) -> impl Iterator<Item = (&mut Servo, &mut i32)> {
        let len = self.scan_len();
        self.slots[..len]
            .iter_mut()
            .zip(self.next_positions.iter_mut())
            .filter_map(|(slot, next)| slot.as_mut().map(|servo| (servo, next)))
    }

    /// Check if any attached servo is moving
    pub fn is_one_servo_moving(&self) -> bool {
        self.iter().any(|(_, servo)| servo.is_moving())
    }
}
