// Copyright 2019 Adam Greig
// Dual licensed under the Apache 2.0 and MIT licenses.

//! SysTick timer: periodic interrupts with a registered callback, or a
//! blocking busy-wait.
//!
//! The timer counts down from the reload value at the core clock rate,
//! assumed to be `ticks_per_ms` ticks each millisecond (16MHz PIOSC by
//! default). Clock-init code which changes the core clock must build the
//! driver with [`SysTick::with_ticks_per_ms`], otherwise every period
//! scales by the ratio of the clocks.

use core::sync::atomic::{AtomicUsize, Ordering};

use stm32ral::{read_reg, write_reg, modify_reg};

use crate::tm4c123::{stk, CLOCK_TICKS_PER_MS};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Error {
    /// The period in milliseconds needs a reload value wider than 24 bits
    ReloadOverflow(u16),
    ZeroDuration,
}

pub type Result<T> = core::result::Result<T, Error>;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum State {
    /// Power-on state, or after `deinit()`
    Uninitialized,
    /// Counting; `interrupt` is set when each expiry raises the exception
    Running { interrupt: bool },
    /// Configured but not counting
    Stopped,
}

/// Callback slot shared between normal code and the SysTick handler.
///
/// Holds the address of an `fn()` so that replacing it is a single atomic
/// store; a tick preempting `set_callback` sees either the old or the new
/// callback, never a torn value.
struct Callback {
    addr: AtomicUsize,
}

impl Callback {
    const fn new() -> Self {
        Callback { addr: AtomicUsize::new(0) }
    }

    fn store(&self, callback: Option<fn()>) {
        let addr = callback.map_or(0, |f| f as usize);
        self.addr.store(addr, Ordering::Release);
    }

    fn load(&self) -> Option<fn()> {
        match self.addr.load(Ordering::Acquire) {
            0 => None,
            // UNSAFE: only `fn()` addresses are stored, and they are never null.
            addr => Some(unsafe { core::mem::transmute::<usize, fn()>(addr) }),
        }
    }
}

static CALLBACK: Callback = Callback::new();

/// SysTick exception entry point.
///
/// Call this from the vector table's SysTick handler. It runs the registered
/// callback once, in interrupt context, or does nothing if none is set.
/// The callback preempts normal code: a slow one delays the next tick and
/// everything running at lower priority.
pub fn handler() {
    if let Some(callback) = CALLBACK.load() {
        callback();
    }
}

/// Reload value for a period of `ms` milliseconds at `ticks_per_ms`.
///
/// Wraps on overflow; only the low 24 bits reach the hardware.
pub fn reload_value(ticks_per_ms: u32, ms: u16) -> u32 {
    ticks_per_ms.wrapping_mul(ms as u32).wrapping_sub(1)
}

pub struct SysTick {
    stk: stk::Instance,
    ticks_per_ms: u32,
}

impl SysTick {
    pub fn new(stk: stk::Instance) -> Self {
        SysTick { stk, ticks_per_ms: CLOCK_TICKS_PER_MS }
    }

    pub unsafe fn steal() -> Self {
        SysTick::new(stk::steal())
    }

    /// Use a core clock of `ticks_per_ms` ticks per millisecond
    pub fn with_ticks_per_ms(self, ticks_per_ms: u32) -> Self {
        SysTick { ticks_per_ms, ..self }
    }

    /// Start raising the SysTick exception every `ms` milliseconds.
    ///
    /// Periods too long for the 24-bit reload register are silently
    /// truncated; use `try_init` to have them refused instead.
    pub fn init(&self, ms: u16) {
        self.program(reload_value(self.ticks_per_ms, ms));
        write_reg!(stk, self.stk, CTRL, ENABLE: Enabled, TICKINT: Enabled, CLKSOURCE: SystemClock);
    }

    /// As `init`, but refuses periods the reload register cannot hold,
    /// leaving the timer untouched.
    pub fn try_init(&self, ms: u16) -> Result<()> {
        let ticks = self.ticks_per_ms as u64 * ms as u64;
        if ticks == 0 {
            return Err(Error::ZeroDuration);
        }
        if ticks - 1 > stk::LOAD::RELOAD::mask as u64 {
            return Err(Error::ReloadOverflow(ms));
        }
        self.init(ms);
        Ok(())
    }

    /// Block for `ms` milliseconds, polling the count flag.
    ///
    /// Whatever the timer was doing before is abandoned, and it is left
    /// stopped with its interrupt disabled when this returns. There is no
    /// way to cut the wait short.
    pub fn start_busy_wait(&self, ms: u16) {
        self.program(reload_value(self.ticks_per_ms, ms));
        write_reg!(stk, self.stk, CTRL, ENABLE: Enabled, TICKINT: Disabled, CLKSOURCE: SystemClock);
        while read_reg!(stk, self.stk, CTRL, COUNTFLAG == NotCounted) {}
        self.stop();
    }

    /// Stop counting. Reload value and callback are kept.
    pub fn stop(&self) {
        modify_reg!(stk, self.stk, CTRL, ENABLE: Disabled);
    }

    /// Resume counting.
    ///
    /// After `deinit` the reload value is zero, so this gives a timer that
    /// expires immediately and forever until `init` is called again.
    pub fn start(&self) {
        modify_reg!(stk, self.stk, CTRL, ENABLE: Enabled);
    }

    /// Replace the callback run by `handler()`. `None` disarms it while the
    /// exception keeps firing.
    pub fn set_callback(&self, callback: Option<fn()>) {
        CALLBACK.store(callback);
    }

    /// Stop the timer, clear its registers and drop the callback.
    pub fn deinit(&self) {
        write_reg!(stk, self.stk, CTRL, 0);
        write_reg!(stk, self.stk, LOAD, 0);
        write_reg!(stk, self.stk, VAL, 0);
        CALLBACK.store(None);
    }

    pub fn state(&self) -> State {
        let (enable, tickint) = read_reg!(stk, self.stk, CTRL, ENABLE, TICKINT);
        if enable == 1 {
            State::Running { interrupt: tickint == 1 }
        } else if read_reg!(stk, self.stk, LOAD, RELOAD) == 0 {
            State::Uninitialized
        } else {
            State::Stopped
        }
    }

    pub fn reload(&self) -> u32 {
        read_reg!(stk, self.stk, LOAD, RELOAD)
    }

    pub fn current(&self) -> u32 {
        read_reg!(stk, self.stk, VAL, CURRENT)
    }

    fn program(&self, reload: u32) {
        // Disable while reconfiguring
        write_reg!(stk, self.stk, CTRL, 0);
        write_reg!(stk, self.stk, LOAD, RELOAD: reload);
        // Any write clears the current value and COUNTFLAG
        write_reg!(stk, self.stk, VAL, 0);
    }
}
