/// One of the six LoRaWAN data rates the timeslot engine understands.
///
/// Each variant indexes a fixed row of [`TABLE`]; the numbers themselves are
/// never duplicated as literals anywhere else in the workspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataRate {
    Dr0,
    Dr1,
    Dr2,
    Dr3,
    Dr4,
    Dr5,
}

impl DataRate {
    pub const ALL: [DataRate; 6] = [
        DataRate::Dr0,
        DataRate::Dr1,
        DataRate::Dr2,
        DataRate::Dr3,
        DataRate::Dr4,
        DataRate::Dr5,
    ];

    /// Recover a `DataRate` from its wire index, or `None` if out of range.
    ///
    /// Boundary rejection (the `SlotModelError::InvalidDataRate` case) lives
    /// one layer up in `ticom`/`collision_avoider`, which call this and turn
    /// `None` into the reportable error.
    pub fn from_index(index: u8) -> Option<DataRate> {
        DataRate::ALL.get(index as usize).copied()
    }

    pub fn as_index(self) -> u8 {
        self as u8
    }

    pub fn parameters(self) -> &'static SlotParameters {
        &TABLE[self as usize]
    }

    pub fn slots_per_day(self) -> usize {
        self.parameters().slots_per_day
    }

    pub fn slot_duration_secs(self) -> f64 {
        self.parameters().slot_duration_secs
    }

    pub fn max_push(self) -> u16 {
        self.parameters().max_push
    }
}

/// The three constants that fully describe a data rate's timeslot geometry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SlotParameters {
    /// Number of slots in a day, `N(DR)`.
    pub slots_per_day: usize,
    /// Slot duration in seconds.
    pub slot_duration_secs: f64,
    /// Maximum cumulative absolute offset push permitted, `K(DR)`.
    pub max_push: u16,
}

/// The fixed per-DR constants table (see the data model section of the spec).
pub const TABLE: [SlotParameters; 6] = [
    SlotParameters { slots_per_day: 1986, slot_duration_secs: 1.81269, max_push: 5 },
    SlotParameters { slots_per_day: 3972, slot_duration_secs: 0.90634, max_push: 11 },
    SlotParameters { slots_per_day: 7944, slot_duration_secs: 0.45317, max_push: 22 },
    SlotParameters { slots_per_day: 15888, slot_duration_secs: 0.22659, max_push: 44 },
    SlotParameters { slots_per_day: 31776, slot_duration_secs: 0.11329, max_push: 88 },
    SlotParameters { slots_per_day: 63552, slot_duration_secs: 0.05665, max_push: 176 },
];
