// Copyright 2019 Adam Greig
// Dual licensed under the Apache 2.0 and MIT licenses.

//! Interrupt enable, pending and priority control for peripheral
//! interrupt lines and the configurable core exceptions.
//!
//! Every method is a short read-modify-write or plain write of one
//! register. Nothing here masks interrupts around those sequences: if an
//! interrupt handler also changes priorities or enables, the caller must
//! serialise access (for example with `cortex_m::interrupt::free`).
//!
//! Interrupt numbers are not range checked. Lines above `MAX_IRQ` hit
//! unimplemented register bits, which the hardware ignores; numbers of 240
//! and above run off the end of the priority array and panic. Priority
//! values are written as-is and the hardware ignores the unimplemented low
//! bits (see [`priority`]).

use stm32ral::{read_reg, modify_reg, RWRegister};

use crate::tm4c123::{nvic, scb, Exception, NVIC_PRIO_BITS};
use crate::tm4c123::nvic::IPR;
use crate::tm4c123::scb::SHPR;

/// Encode a logical priority level (0 most urgent) into the implemented
/// top `NVIC_PRIO_BITS` of an 8-bit priority field.
///
/// Levels that do not fit silently lose their high bits.
pub fn priority(level: u8) -> u8 {
    level << (8 - NVIC_PRIO_BITS)
}

pub struct NVIC {
    nvic: nvic::Instance,
    scb: scb::Instance,
}

impl NVIC {
    pub fn new(nvic: nvic::Instance, scb: scb::Instance) -> Self {
        NVIC { nvic, scb }
    }

    pub unsafe fn steal() -> Self {
        NVIC { nvic: nvic::steal(), scb: scb::steal() }
    }

    /// Enable interrupt line `irq`.
    pub fn enable_irq<I: Into<u8>>(&self, irq: I) {
        let (idx, bit) = bank(irq.into());
        let iser = &self.nvic.ISER[idx];
        iser.write(iser.read() | bit);
        barrier();
    }

    /// Disable interrupt line `irq`.
    ///
    /// Once this returns the line's handler will not start until it is
    /// enabled again.
    pub fn disable_irq<I: Into<u8>>(&self, irq: I) {
        let (idx, bit) = bank(irq.into());
        // ICER reads back the enable state; write only our bit.
        self.nvic.ICER[idx].write(bit);
        barrier();
    }

    pub fn is_irq_enabled<I: Into<u8>>(&self, irq: I) -> bool {
        let (idx, bit) = bank(irq.into());
        self.nvic.ISER[idx].read() & bit != 0
    }

    /// Mark `irq` pending, as if the peripheral had requested it.
    pub fn pend_irq<I: Into<u8>>(&self, irq: I) {
        let (idx, bit) = bank(irq.into());
        self.nvic.ISPR[idx].write(bit);
    }

    pub fn unpend_irq<I: Into<u8>>(&self, irq: I) {
        let (idx, bit) = bank(irq.into());
        self.nvic.ICPR[idx].write(bit);
    }

    pub fn is_irq_pending<I: Into<u8>>(&self, irq: I) -> bool {
        let (idx, bit) = bank(irq.into());
        self.nvic.ISPR[idx].read() & bit != 0
    }

    /// Set the raw 8-bit priority field of `irq`, leaving the other three
    /// fields sharing its register untouched.
    pub fn set_irq_priority<I: Into<u8>>(&self, irq: I, priority: u8) {
        let (idx, shift) = field(irq.into());
        set_field(&self.nvic.IPR[idx], shift, priority);
    }

    pub fn get_irq_priority<I: Into<u8>>(&self, irq: I) -> u8 {
        let (idx, shift) = field(irq.into());
        get_field(&self.nvic.IPR[idx], shift)
    }

    /// Enable a configurable fault handler.
    ///
    /// Exceptions without an enable bit in SHCSR are always enabled, so this
    /// does nothing for them.
    pub fn enable_exception(&self, exception: Exception) {
        if let Some(bit) = exception.enable_bit() {
            modify_reg!(scb, self.scb, SHCSR, |r| r | (1 << bit));
        }
    }

    /// Disable a configurable fault handler; the fault escalates to
    /// HardFault while disabled.
    pub fn disable_exception(&self, exception: Exception) {
        if let Some(bit) = exception.enable_bit() {
            modify_reg!(scb, self.scb, SHCSR, |r| r & !(1 << bit));
        }
    }

    pub fn is_exception_enabled(&self, exception: Exception) -> bool {
        match exception.enable_bit() {
            Some(bit) => read_reg!(scb, self.scb, SHCSR) & (1 << bit) != 0,
            None => true,
        }
    }

    /// Set the raw 8-bit priority field of a core exception in SHPR1-3.
    pub fn set_exception_priority(&self, exception: Exception, priority: u8) {
        let (idx, shift) = field(u8::from(exception) - SHPR::first_exception);
        set_field(&self.scb.SHPR[idx], shift, priority);
    }

    pub fn get_exception_priority(&self, exception: Exception) -> u8 {
        let (idx, shift) = field(u8::from(exception) - SHPR::first_exception);
        get_field(&self.scb.SHPR[idx], shift)
    }
}

/// Register index and bit mask of line `n` in a one-bit-per-line array.
fn bank(n: u8) -> (usize, u32) {
    ((n / 32) as usize, 1 << (n % 32))
}

/// Register index and bit shift of slot `n` in a four-per-register array.
fn field(n: u8) -> (usize, u32) {
    ((n / 4) as usize, (n % 4) as u32 * IPR::field_width)
}

fn set_field(reg: &RWRegister<u32>, shift: u32, value: u8) {
    let mask = IPR::field_mask << shift;
    reg.write((reg.read() & !mask) | ((value as u32) << shift));
}

fn get_field(reg: &RWRegister<u32>, shift: u32) -> u8 {
    ((reg.read() >> shift) & IPR::field_mask) as u8
}

#[inline]
fn barrier() {
    #[cfg(target_arch = "arm")]
    {
        cortex_m::asm::dsb();
        cortex_m::asm::isb();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tm4c123::{fake, Interrupt, MAX_IRQ};

    fn nvic() -> NVIC {
        NVIC::new(fake(), fake())
    }

    #[test]
    fn enable_irq_sets_only_its_bit() {
        let nvic = nvic();
        for irq in 0..=MAX_IRQ {
            let (idx, bit) = ((irq / 32) as usize, 1u32 << (irq % 32));
            let before = 0x5A5A_5A5A & !bit;
            nvic.nvic.ISER[idx].write(before);
            nvic.enable_irq(irq);
            assert_eq!(nvic.nvic.ISER[idx].read(), before | bit, "irq {}", irq);
            assert!(nvic.is_irq_enabled(irq));
        }
    }

    #[test]
    fn disable_irq_writes_clear_enable_register() {
        let nvic = nvic();
        for irq in 0..=MAX_IRQ {
            let (idx, bit) = ((irq / 32) as usize, 1u32 << (irq % 32));
            nvic.nvic.ISER[idx].write(0xFFFF_FFFF);
            nvic.nvic.ICER[idx].write(0);
            nvic.disable_irq(irq);
            assert_eq!(nvic.nvic.ICER[idx].read(), bit, "irq {}", irq);
            assert_eq!(nvic.nvic.ISER[idx].read(), 0xFFFF_FFFF);
        }
    }

    #[test]
    fn enable_and_disable_are_idempotent() {
        let nvic = nvic();
        nvic.enable_irq(Interrupt::TIMER5A);
        let once = nvic.nvic.ISER[2].read();
        nvic.enable_irq(Interrupt::TIMER5A);
        assert_eq!(nvic.nvic.ISER[2].read(), once);
        assert_eq!(once, 1 << 28);

        nvic.disable_irq(Interrupt::TIMER5A);
        let once = nvic.nvic.ICER[2].read();
        nvic.disable_irq(Interrupt::TIMER5A);
        assert_eq!(nvic.nvic.ICER[2].read(), once);
    }

    #[test]
    fn named_interrupts_land_in_their_bank() {
        let nvic = nvic();
        nvic.enable_irq(Interrupt::GPIOF);
        nvic.enable_irq(Interrupt::PWM1_FAULT);
        assert_eq!(nvic.nvic.ISER[0].read(), 1 << 30);
        assert_eq!(nvic.nvic.ISER[4].read(), 1 << 10);
        assert!(!nvic.is_irq_enabled(Interrupt::GPIOA));
    }

    #[test]
    fn set_irq_priority_keeps_neighbouring_fields() {
        let nvic = nvic();
        for irq in 0..=MAX_IRQ {
            for &p in &[0x00, 0x13, 0x20, 0xE0, 0xFF] {
                let (idx, shift) = ((irq / 4) as usize, (irq % 4) as u32 * 8);
                let others = !(0xFFu32 << shift);
                nvic.nvic.IPR[idx].write(0xA1B2_C3D4);
                nvic.set_irq_priority(irq, p);
                let after = nvic.nvic.IPR[idx].read();
                assert_eq!(after & others, 0xA1B2_C3D4 & others, "irq {}", irq);
                assert_eq!((after >> shift) & 0xFF, p as u32);
                assert_eq!(nvic.get_irq_priority(irq), p);
            }
        }
    }

    #[test]
    fn named_interrupt_priority() {
        let nvic = nvic();
        nvic.set_irq_priority(Interrupt::UART0, priority(2));
        assert_eq!(nvic.nvic.IPR[1].read(), 0x0000_4000);
    }

    #[test]
    fn pending_bits() {
        let nvic = nvic();
        nvic.pend_irq(Interrupt::WTIMER5B);
        assert_eq!(nvic.nvic.ISPR[3].read(), 1 << 9);
        assert!(nvic.is_irq_pending(Interrupt::WTIMER5B));
        nvic.unpend_irq(Interrupt::WTIMER5B);
        assert_eq!(nvic.nvic.ICPR[3].read(), 1 << 9);
    }

    #[test]
    fn priority_uses_top_bits() {
        assert_eq!(priority(0), 0x00);
        assert_eq!(priority(1), 0x20);
        assert_eq!(priority(7), 0xE0);
        // 9 does not fit three bits
        assert_eq!(priority(9), 0x20);
    }

    #[test]
    fn fault_exceptions_toggle_their_shcsr_bit() {
        let nvic = nvic();
        nvic.scb.SHCSR.write(0x0000_0080);

        nvic.enable_exception(Exception::MemoryManagement);
        nvic.enable_exception(Exception::UsageFault);
        assert_eq!(nvic.scb.SHCSR.read(), 0x0005_0080);
        assert!(nvic.is_exception_enabled(Exception::UsageFault));
        assert!(!nvic.is_exception_enabled(Exception::BusFault));

        nvic.disable_exception(Exception::MemoryManagement);
        assert_eq!(nvic.scb.SHCSR.read(), 0x0004_0080);

        nvic.enable_exception(Exception::BusFault);
        nvic.enable_exception(Exception::BusFault);
        assert_eq!(nvic.scb.SHCSR.read(), 0x0006_0080);
    }

    #[test]
    fn always_on_exceptions_leave_shcsr_alone() {
        let nvic = nvic();
        nvic.scb.SHCSR.write(0x0001_0000);
        nvic.enable_exception(Exception::SysTick);
        nvic.disable_exception(Exception::PendSV);
        assert_eq!(nvic.scb.SHCSR.read(), 0x0001_0000);
        assert!(nvic.is_exception_enabled(Exception::SVCall));
    }

    #[test]
    fn exception_priority_register_layout() {
        let nvic = nvic();
        let cases = [
            (Exception::MemoryManagement, 0, 0),
            (Exception::BusFault, 0, 8),
            (Exception::UsageFault, 0, 16),
            (Exception::SVCall, 1, 24),
            (Exception::DebugMonitor, 2, 0),
            (Exception::PendSV, 2, 16),
            (Exception::SysTick, 2, 24),
        ];
        for &(exception, idx, shift) in cases.iter() {
            for shpr in nvic.scb.SHPR.iter() {
                shpr.write(0x1122_3344);
            }
            nvic.set_exception_priority(exception, 0xE0);
            let expected = (0x1122_3344 & !(0xFFu32 << shift)) | (0xE0 << shift);
            for (i, shpr) in nvic.scb.SHPR.iter().enumerate() {
                if i == idx {
                    assert_eq!(shpr.read(), expected, "{:?}", exception);
                } else {
                    assert_eq!(shpr.read(), 0x1122_3344, "{:?}", exception);
                }
            }
            assert_eq!(nvic.get_exception_priority(exception), 0xE0);
        }
    }
}
