// Copyright 2019 Adam Greig
// Dual licensed under the Apache 2.0 and MIT licenses.

#![no_std]
#![no_main]

extern crate panic_halt;
use core::sync::atomic::{AtomicU32, Ordering};
use cortex_m_rt::{entry, exception};
use cortex_m_semihosting::hprintln;

use tm4c_core::hal::{nvic::{priority, NVIC}, systick};
use tm4c_core::tm4c123::{self, Exception, Interrupt};

static TICKS: AtomicU32 = AtomicU32::new(0);

fn tick() {
    TICKS.fetch_add(1, Ordering::Relaxed);
}

fn tock() {
    TICKS.fetch_add(10, Ordering::Relaxed);
}

#[exception]
fn SysTick() {
    systick::handler();
}

#[entry]
fn main() -> ! {
    let nvic = NVIC::new(tm4c123::nvic::take().unwrap(), tm4c123::scb::take().unwrap());
    let systick = systick::SysTick::new(tm4c123::stk::take().unwrap());

    // Faults get their own handlers instead of escalating to HardFault
    nvic.enable_exception(Exception::MemoryManagement);
    nvic.enable_exception(Exception::BusFault);
    nvic.enable_exception(Exception::UsageFault);

    // SysTick below the GPIO port F interrupt
    nvic.set_exception_priority(Exception::SysTick, priority(3));
    nvic.set_irq_priority(Interrupt::GPIOF, priority(1));
    nvic.enable_irq(Interrupt::GPIOF);

    hprintln!("Busy-waiting 500ms").ok();
    systick.start_busy_wait(500);
    hprintln!("SysTick state after busy-wait: {:?}", systick.state()).ok();

    systick.set_callback(Some(tick));
    if let Err(e) = systick.try_init(10) {
        hprintln!("SysTick init error: {:?}", e).ok();
    }

    let mut reported = 0;
    let mut swapped = false;
    loop {
        cortex_m::asm::wfi();
        let ticks = TICKS.load(Ordering::Relaxed);
        if ticks >= reported + 100 {
            reported = ticks;
            hprintln!("{} ticks", ticks).ok();
        }
        if ticks >= 1000 && !swapped {
            // Count faster from here on; the swap is safe while ticking
            systick.set_callback(Some(tock));
            swapped = true;
        }
        if ticks >= 2000 {
            systick.deinit();
            nvic.disable_irq(Interrupt::GPIOF);
            hprintln!("Done, SysTick state: {:?}", systick.state()).ok();
            break;
        }
    }

    loop {
        cortex_m::asm::nop();
    }
}
