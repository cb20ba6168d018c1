//! Machine registers.

/// The machine carries exactly four registers.
pub const REGISTER_COUNT: usize = 4;

/// Index of a machine register.
///
/// Addressing a register past the fixed bank is a programming error, caught
/// at construction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Reg(u8);

impl Reg {
    /// Panics if `index` is not within the register bank.
    pub fn new(index: u8) -> Reg {
        assert!(
            (index as usize) < REGISTER_COUNT,
            "register index {index} out of range (the machine has {REGISTER_COUNT} registers)"
        );
        Reg(index)
    }

    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for Reg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "r{}", self.0)
    }
}
