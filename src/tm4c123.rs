// Copyright 2019 Adam Greig
// Dual licensed under the Apache 2.0 and MIT licenses.

//! TM4C123GH6PM core peripheral memory map.
//!
//! Laid out the way stm32ral generates its peripheral modules, so the
//! `read_reg!`, `write_reg!` and `modify_reg!` macros work unchanged on
//! these blocks. Only the registers the drivers touch have field modules.

#![allow(non_snake_case, non_upper_case_globals, non_camel_case_types)]

use num_enum::{IntoPrimitive, TryFromPrimitive};

/// PIOSC runs at 16MHz out of reset; clock-init code may change this.
pub const CLOCK_TICKS_PER_MS: u32 = 16_000;

/// Number of implemented bits in each 8-bit priority field.
pub const NVIC_PRIO_BITS: u8 = 3;

/// Highest peripheral interrupt number on this part.
pub const MAX_IRQ: u8 = 138;

macro_rules! singleton {
    ($base:ident) => {
        static TAKEN: core::sync::atomic::AtomicBool =
            core::sync::atomic::AtomicBool::new(false);

        /// A handle to the register block at its fixed address
        pub type Instance = &'static RegisterBlock;

        /// Returns the instance the first time it is called, `None` after
        pub fn take() -> Option<Instance> {
            if TAKEN.swap(true, core::sync::atomic::Ordering::Relaxed) {
                None
            } else {
                // UNSAFE: first and only handout of the instance.
                Some(unsafe { steal() })
            }
        }

        /// Unsafely obtain the instance, ignoring whether it was taken
        pub unsafe fn steal() -> Instance {
            &*$base
        }
    };
}

/// Nested Vectored Interrupt Controller
pub mod nvic {
    use stm32ral::RWRegister;

    /// Interrupt Priority Registers (PRI0-PRI34)
    pub mod IPR {
        /// Width of one priority field
        pub const field_width: u32 = 8;
        /// Mask of one priority field
        pub const field_mask: u32 = 0xff;
    }

    #[repr(C)]
    pub struct RegisterBlock {
        /// Interrupt Set-Enable, one bit per line
        pub ISER: [RWRegister<u32>; 8],
        _reserved0: [u32; 24],
        /// Interrupt Clear-Enable, one bit per line
        pub ICER: [RWRegister<u32>; 8],
        _reserved1: [u32; 24],
        /// Interrupt Set-Pending, one bit per line
        pub ISPR: [RWRegister<u32>; 8],
        _reserved2: [u32; 24],
        /// Interrupt Clear-Pending, one bit per line
        pub ICPR: [RWRegister<u32>; 8],
        _reserved3: [u32; 24],
        /// Interrupt Active Bit, one bit per line
        pub IABR: [RWRegister<u32>; 8],
        _reserved4: [u32; 56],
        /// Interrupt Priority, four 8-bit fields per register
        pub IPR: [RWRegister<u32>; 60],
    }

    /// Raw pointer to NVIC
    pub const NVIC: *const RegisterBlock = 0xE000_E100 as *const _;

    singleton!(NVIC);
}

/// System Control Block
pub mod scb {
    use stm32ral::RWRegister;

    /// System Handler Priority Registers (SYSPRI1-SYSPRI3)
    pub mod SHPR {
        /// Exception number held in byte 0 of SHPR1
        pub const first_exception: u8 = 4;
    }

    /// System Handler Control and State Register (SYSHNDCTRL)
    pub mod SHCSR {
        /// Memory management fault enable
        pub mod MEMFAULTENA {
            /// Offset (16 bits)
            pub const offset: u32 = 16;
            /// Mask (1 bit: 1 << 16)
            pub const mask: u32 = 1 << offset;
            /// Read-only values (empty)
            pub mod R {}
            /// Write-only values (empty)
            pub mod W {}
            /// Read-write values
            pub mod RW {
                /// 0b0: Exception disabled, escalates to HardFault
                pub const Disabled: u32 = 0b0;
                /// 0b1: Exception enabled
                pub const Enabled: u32 = 0b1;
            }
        }

        /// Bus fault enable
        pub mod BUSFAULTENA {
            /// Offset (17 bits)
            pub const offset: u32 = 17;
            /// Mask (1 bit: 1 << 17)
            pub const mask: u32 = 1 << offset;
            pub use super::MEMFAULTENA::{R, W, RW};
        }

        /// Usage fault enable
        pub mod USGFAULTENA {
            /// Offset (18 bits)
            pub const offset: u32 = 18;
            /// Mask (1 bit: 1 << 18)
            pub const mask: u32 = 1 << offset;
            pub use super::MEMFAULTENA::{R, W, RW};
        }
    }

    #[repr(C)]
    pub struct RegisterBlock {
        /// CPU ID Base, read-only
        pub CPUID: RWRegister<u32>,
        /// Interrupt Control and State
        pub ICSR: RWRegister<u32>,
        /// Vector Table Offset
        pub VTOR: RWRegister<u32>,
        /// Application Interrupt and Reset Control
        pub AIRCR: RWRegister<u32>,
        /// System Control
        pub SCR: RWRegister<u32>,
        /// Configuration and Control
        pub CCR: RWRegister<u32>,
        /// System Handler Priority 1-3
        pub SHPR: [RWRegister<u32>; 3],
        /// System Handler Control and State
        pub SHCSR: RWRegister<u32>,
    }

    /// Raw pointer to SCB
    pub const SCB: *const RegisterBlock = 0xE000_ED00 as *const _;

    singleton!(SCB);
}

/// SysTick timer
pub mod stk {
    use stm32ral::RWRegister;

    /// SysTick Control and Status Register (STCTRL)
    pub mod CTRL {
        /// Counter enable
        pub mod ENABLE {
            /// Offset (0 bits)
            pub const offset: u32 = 0;
            /// Mask (1 bit: 1 << 0)
            pub const mask: u32 = 1 << offset;
            /// Read-only values (empty)
            pub mod R {}
            /// Write-only values (empty)
            pub mod W {}
            /// Read-write values
            pub mod RW {
                /// 0b0: Counter disabled
                pub const Disabled: u32 = 0b0;
                /// 0b1: Counter enabled
                pub const Enabled: u32 = 0b1;
            }
        }

        /// Interrupt on count reaching zero
        pub mod TICKINT {
            /// Offset (1 bits)
            pub const offset: u32 = 1;
            /// Mask (1 bit: 1 << 1)
            pub const mask: u32 = 1 << offset;
            pub use super::ENABLE::{R, W, RW};
        }

        /// Clock source
        pub mod CLKSOURCE {
            /// Offset (2 bits)
            pub const offset: u32 = 2;
            /// Mask (1 bit: 1 << 2)
            pub const mask: u32 = 1 << offset;
            /// Read-only values (empty)
            pub mod R {}
            /// Write-only values (empty)
            pub mod W {}
            /// Read-write values
            pub mod RW {
                /// 0b0: PIOSC divided by 4
                pub const PIOSCDiv4: u32 = 0b0;
                /// 0b1: System clock
                pub const SystemClock: u32 = 0b1;
            }
        }

        /// Set when the counter has reached zero since the last read
        pub mod COUNTFLAG {
            /// Offset (16 bits)
            pub const offset: u32 = 16;
            /// Mask (1 bit: 1 << 16)
            pub const mask: u32 = 1 << offset;
            /// Read-only values
            pub mod R {
                /// 0b0: Not counted to zero since last read
                pub const NotCounted: u32 = 0b0;
                /// 0b1: Counted to zero since last read
                pub const Counted: u32 = 0b1;
            }
            /// Write-only values (empty)
            pub mod W {}
            /// Read-write values (empty)
            pub mod RW {}
        }
    }

    /// SysTick Reload Value Register (STRELOAD)
    pub mod LOAD {
        /// Reload value
        pub mod RELOAD {
            /// Offset (0 bits)
            pub const offset: u32 = 0;
            /// Mask (24 bits: 0xffffff << 0)
            pub const mask: u32 = 0x00ff_ffff << offset;
            /// Read-only values (empty)
            pub mod R {}
            /// Write-only values (empty)
            pub mod W {}
            /// Read-write values (empty)
            pub mod RW {}
        }
    }

    /// SysTick Current Value Register (STCURRENT)
    pub mod VAL {
        /// Current value, any write clears it
        pub mod CURRENT {
            /// Offset (0 bits)
            pub const offset: u32 = 0;
            /// Mask (24 bits: 0xffffff << 0)
            pub const mask: u32 = 0x00ff_ffff << offset;
            /// Read-only values (empty)
            pub mod R {}
            /// Write-only values (empty)
            pub mod W {}
            /// Read-write values (empty)
            pub mod RW {}
        }
    }

    #[repr(C)]
    pub struct RegisterBlock {
        /// Control and Status
        pub CTRL: RWRegister<u32>,
        /// Reload Value
        pub LOAD: RWRegister<u32>,
        /// Current Value
        pub VAL: RWRegister<u32>,
        /// Calibration Value, read-only
        pub CALIB: RWRegister<u32>,
    }

    /// Raw pointer to STK
    pub const STK: *const RegisterBlock = 0xE000_E010 as *const _;

    singleton!(STK);
}

/// TM4C123GH6PM peripheral interrupt numbers
#[derive(Copy, Clone, Debug, PartialEq, Eq, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum Interrupt {
    GPIOA = 0,
    GPIOB = 1,
    GPIOC = 2,
    GPIOD = 3,
    GPIOE = 4,
    UART0 = 5,
    UART1 = 6,
    SSI0 = 7,
    I2C0 = 8,
    PWM0_FAULT = 9,
    PWM0_0 = 10,
    PWM0_1 = 11,
    PWM0_2 = 12,
    QEI0 = 13,
    ADC0SS0 = 14,
    ADC0SS1 = 15,
    ADC0SS2 = 16,
    ADC0SS3 = 17,
    WATCHDOG = 18,
    TIMER0A = 19,
    TIMER0B = 20,
    TIMER1A = 21,
    TIMER1B = 22,
    TIMER2A = 23,
    TIMER2B = 24,
    COMP0 = 25,
    COMP1 = 26,
    SYSCTL = 28,
    FLASH = 29,
    GPIOF = 30,
    UART2 = 33,
    SSI1 = 34,
    TIMER3A = 35,
    TIMER3B = 36,
    I2C1 = 37,
    QEI1 = 38,
    CAN0 = 39,
    CAN1 = 40,
    HIBERNATE = 43,
    USB0 = 44,
    PWM0_3 = 45,
    UDMA = 46,
    UDMAERR = 47,
    ADC1SS0 = 48,
    ADC1SS1 = 49,
    ADC1SS2 = 50,
    ADC1SS3 = 51,
    SSI2 = 57,
    SSI3 = 58,
    UART3 = 59,
    UART4 = 60,
    UART5 = 61,
    UART6 = 62,
    UART7 = 63,
    I2C2 = 68,
    I2C3 = 69,
    TIMER4A = 70,
    TIMER4B = 71,
    TIMER5A = 92,
    TIMER5B = 93,
    WTIMER0A = 94,
    WTIMER0B = 95,
    WTIMER1A = 96,
    WTIMER1B = 97,
    WTIMER2A = 98,
    WTIMER2B = 99,
    WTIMER3A = 100,
    WTIMER3B = 101,
    WTIMER4A = 102,
    WTIMER4B = 103,
    WTIMER5A = 104,
    WTIMER5B = 105,
    SYSEXC = 106,
    PWM1_0 = 134,
    PWM1_1 = 135,
    PWM1_2 = 136,
    PWM1_3 = 137,
    PWM1_FAULT = 138,
}

/// Core exceptions whose priority is configurable, by exception number
#[derive(Copy, Clone, Debug, PartialEq, Eq, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum Exception {
    MemoryManagement = 4,
    BusFault = 5,
    UsageFault = 6,
    SVCall = 11,
    DebugMonitor = 12,
    PendSV = 14,
    SysTick = 15,
}

impl Exception {
    /// Bit in SHCSR which enables this exception.
    ///
    /// Only the configurable faults have one; the others are always enabled.
    pub fn enable_bit(self) -> Option<u8> {
        use scb::SHCSR::*;
        match self {
            Exception::MemoryManagement => Some(MEMFAULTENA::offset as u8),
            Exception::BusFault => Some(BUSFAULTENA::offset as u8),
            Exception::UsageFault => Some(USGFAULTENA::offset as u8),
            _ => None,
        }
    }
}

/// Zeroed, leaked register block standing in for the memory map in tests.
#[cfg(test)]
pub(crate) fn fake<T: 'static>() -> &'static T {
    // UNSAFE: every register block here is plain u32 cells, valid when zero.
    Box::leak(Box::new(unsafe { core::mem::zeroed() }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::convert::TryFrom;
    use core::mem::size_of;

    #[test]
    fn register_blocks_match_architectural_offsets() {
        // IPR starts 0x300 after ISER (0xE000_E400)
        assert_eq!(size_of::<nvic::RegisterBlock>(), 0x300 + 60 * 4);
        // SHCSR is at SCB + 0x24
        assert_eq!(size_of::<scb::RegisterBlock>(), 0x28);
        assert_eq!(size_of::<stk::RegisterBlock>(), 0x10);
    }

    #[test]
    fn interrupt_numbers_convert_both_ways() {
        assert_eq!(u8::from(Interrupt::GPIOF), 30);
        assert_eq!(u8::from(Interrupt::PWM1_FAULT), MAX_IRQ);
        assert_eq!(Interrupt::try_from(19).ok(), Some(Interrupt::TIMER0A));
        // 27 is reserved on this part
        assert!(Interrupt::try_from(27).is_err());
        assert!(Interrupt::try_from(139).is_err());
    }

    #[test]
    fn exception_enable_bits() {
        assert_eq!(Exception::MemoryManagement.enable_bit(), Some(16));
        assert_eq!(Exception::BusFault.enable_bit(), Some(17));
        assert_eq!(Exception::UsageFault.enable_bit(), Some(18));
        assert_eq!(Exception::SysTick.enable_bit(), None);
        assert_eq!(Exception::try_from(14).ok(), Some(Exception::PendSV));
        assert!(Exception::try_from(3).is_err());
    }
}
