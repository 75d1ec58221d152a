//! A frame pacer: a background timer which lets render threads proceed at a
//! target frequency without busy-waiting.

pub mod logging;
pub mod timing;
