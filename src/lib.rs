// Copyright 2019 Adam Greig
// Dual licensed under the Apache 2.0 and MIT licenses.

//! NVIC and SysTick drivers for the TM4C123 (Cortex-M4F).
//!
//! `tm4c123` describes the core peripheral registers; `hal` drives them.
//! Neither driver validates its arguments: interrupt numbers, priorities
//! and durations are trusted and truncated to their register fields.

#![cfg_attr(not(test), no_std)]

pub mod hal;
pub mod tm4c123;
