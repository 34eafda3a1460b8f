//! CPU exception vectors 0-31.

use num_enum::{IntoPrimitive, TryFromPrimitive};

#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum Exception {
    DivideError = 0,
    Debug = 1,
    NonMaskableInterrupt = 2,
    Breakpoint = 3,
    Overflow = 4,
    BoundRangeExceeded = 5,
    InvalidOpcode = 6,
    DeviceNotAvailable = 7,
    DoubleFault = 8,
    CoprocessorSegmentOverrun = 9,
    InvalidTss = 10,
    SegmentNotPresent = 11,
    StackSegmentFault = 12,
    GeneralProtection = 13,
    PageFault = 14,
    X87FloatingPoint = 16,
    AlignmentCheck = 17,
    MachineCheck = 18,
    SimdFloatingPoint = 19,
    Virtualization = 20,
    ControlProtection = 21,
    HypervisorInjection = 28,
    VmmCommunication = 29,
    Security = 30,
}

/// Vectors below this are reserved for CPU exceptions.
pub const EXCEPTION_COUNT: u8 = 32;

impl Exception {
    pub fn from_vector(vector: u8) -> Option<Self> {
        Self::try_from(vector).ok()
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::DivideError => "DIVIDE ERROR",
            Self::Debug => "DEBUG",
            Self::NonMaskableInterrupt => "NON-MASKABLE INTERRUPT",
            Self::Breakpoint => "BREAKPOINT",
            Self::Overflow => "OVERFLOW",
            Self::BoundRangeExceeded => "BOUND RANGE EXCEEDED",
            Self::InvalidOpcode => "INVALID OPCODE",
            Self::DeviceNotAvailable => "DEVICE NOT AVAILABLE",
            Self::DoubleFault => "DOUBLE FAULT",
            Self::CoprocessorSegmentOverrun => "COPROCESSOR SEGMENT OVERRUN",
            Self::InvalidTss => "INVALID TSS",
            Self::SegmentNotPresent => "SEGMENT NOT PRESENT",
            Self::StackSegmentFault => "STACK-SEGMENT FAULT",
            Self::GeneralProtection => "GENERAL PROTECTION FAULT",
            Self::PageFault => "PAGE FAULT",
            Self::X87FloatingPoint => "X87 FLOATING-POINT",
            Self::AlignmentCheck => "ALIGNMENT CHECK",
            Self::MachineCheck => "MACHINE CHECK",
            Self::SimdFloatingPoint => "SIMD FLOATING-POINT",
            Self::Virtualization => "VIRTUALIZATION",
            Self::ControlProtection => "CONTROL PROTECTION",
            Self::HypervisorInjection => "HYPERVISOR INJECTION",
            Self::VmmCommunication => "VMM COMMUNICATION",
            Self::Security => "SECURITY",
        }
    }

    /// Whether the CPU pushes an error code for this exception.
    pub fn has_error_code(self) -> bool {
        matches!(
            self,
            Self::DoubleFault
                | Self::InvalidTss
                | Self::SegmentNotPresent
                | Self::StackSegmentFault
                | Self::GeneralProtection
                | Self::PageFault
                | Self::AlignmentCheck
                | Self::ControlProtection
                | Self::VmmCommunication
                | Self::Security
        )
    }
}

pub fn is_exception(vector: u8) -> bool {
    vector < EXCEPTION_COUNT
}

/// Human-readable name for any vector.
pub fn describe(vector: u8) -> &'static str {
    match Exception::from_vector(vector) {
        Some(exception) => exception.name(),
        None if is_exception(vector) => "RESERVED",
        None => "INTERRUPT",
    }
}
