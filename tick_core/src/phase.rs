use std::fmt;

/// Logical frame stage at which tick callbacks run.
///
/// Declaration order is the order of one full logical frame.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub enum TickPhase {
    FixedUpdate,
    Update,
    LateUpdate,
}

impl TickPhase {
    /// All phases in frame order.
    pub const ALL: [TickPhase; 3] = [TickPhase::FixedUpdate, TickPhase::Update, TickPhase::LateUpdate];

    pub fn as_str(self) -> &'static str {
        match self {
            TickPhase::FixedUpdate => "FixedUpdate",
            TickPhase::Update => "Update",
            TickPhase::LateUpdate => "LateUpdate",
        }
    }

    /// Name of the tick method invoked for this phase (used in profiling labels).
    pub fn method_name(self) -> &'static str {
        match self {
            TickPhase::FixedUpdate => "fixed_tick",
            TickPhase::Update => "tick",
            TickPhase::LateUpdate => "late_tick",
        }
    }

    #[inline]
    const fn bit(self) -> u8 {
        1 << (self as u8)
    }
}

impl fmt::Display for TickPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Set of phases a tickable participates in.
#[derive(Copy, Clone, Default, Eq, PartialEq, Hash)]
pub struct PhaseSet(u8);

impl PhaseSet {
    pub const EMPTY: PhaseSet = PhaseSet(0);
    pub const FIXED: PhaseSet = PhaseSet(1 << 0);
    pub const UPDATE: PhaseSet = PhaseSet(1 << 1);
    pub const LATE: PhaseSet = PhaseSet(1 << 2);
    pub const ALL: PhaseSet = PhaseSet(0b111);

    #[inline]
    pub const fn with(self, phase: TickPhase) -> Self {
        PhaseSet(self.0 | phase.bit())
    }

    /// `const` counterpart of `|`, usable in [`Tickable::PHASES`](crate::Tickable::PHASES).
    #[inline]
    pub const fn union(self, other: PhaseSet) -> Self {
        PhaseSet(self.0 | other.0)
    }

    #[inline]
    pub fn contains(self, phase: TickPhase) -> bool {
        self.0 & phase.bit() != 0
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    /// Member phases in frame order.
    pub fn iter(self) -> impl Iterator<Item = TickPhase> {
        TickPhase::ALL.into_iter().filter(move |p| self.contains(*p))
    }
}

impl std::ops::BitOr for PhaseSet {
    type Output = PhaseSet;

    #[inline]
    fn bitor(self, rhs: PhaseSet) -> PhaseSet {
        PhaseSet(self.0 | rhs.0)
    }
}

impl From<TickPhase> for PhaseSet {
    #[inline]
    fn from(phase: TickPhase) -> Self {
        PhaseSet::EMPTY.with(phase)
    }
}

impl FromIterator<TickPhase> for PhaseSet {
    fn from_iter<I: IntoIterator<Item = TickPhase>>(iter: I) -> Self {
        iter.into_iter().fold(PhaseSet::EMPTY, PhaseSet::with)
    }
}

impl fmt::Debug for PhaseSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}
