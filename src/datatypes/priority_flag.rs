// ABOUTME: Defines SMPP v3.4 priority_flag field values for submit_sm and deliver_sm
// ABOUTME: Reserved levels 4-255 are carried through unchanged

use num_enum::{FromPrimitive, IntoPrimitive};

/// SMPP v3.4 Priority Flag Field
///
/// The priority_flag parameter allows the originating SME to assign a priority
/// level to the short message. Each network technology maps the levels to its
/// own handling:
///
/// | Level | GSM          | ANSI-136    | IS-95       |
/// |-------|--------------|-------------|-------------|
/// | 0     | non-priority | bulk        | normal      |
/// | 1     | priority     | normal      | interactive |
/// | 2     | priority     | urgent      | urgent      |
/// | 3     | priority     | very urgent | emergency   |
#[derive(FromPrimitive, IntoPrimitive)]
#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum PriorityFlag {
    Level0 = 0,
    Level1 = 1,
    Level2 = 2,
    Level3 = 3,
    /// Reserved levels, kept so a decoded PDU re-encodes byte for byte
    #[num_enum(catch_all)]
    Reserved(u8),
}

impl Default for PriorityFlag {
    fn default() -> Self {
        PriorityFlag::Level0
    }
}
