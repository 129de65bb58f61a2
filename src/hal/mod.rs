// Copyright 2019 Adam Greig
// Dual licensed under the Apache 2.0 and MIT licenses.

pub mod nvic;
pub mod systick;
