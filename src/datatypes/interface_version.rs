use num_enum::{FromPrimitive, IntoPrimitive};

/// This parameter is used to indicate the version of the SMPP protocol.
///
/// Appears in bind requests and in the `sc_interface_version` optional
/// parameter of bind responses.
#[derive(FromPrimitive, IntoPrimitive)]
#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum InterfaceVersion {
    SmppV33 = 0x33,
    SmppV34 = 0x34,
    #[num_enum(catch_all)]
    Other(u8),
}

impl Default for InterfaceVersion {
    fn default() -> Self {
        InterfaceVersion::SmppV34
    }
}
