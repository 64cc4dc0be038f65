//! # Use ws2812 leds via gpio bit-banging
//!
//! - For usage with `smart-leds`
//! - Implements the `SmartLedsWrite` trait
//!
//! Needs a type implementing the `digital::OutputPin` trait and a [`Timing`]
//! table matching your cpu clock. No spi, pwm or dma peripheral is involved;
//! the pulse train is generated with calibrated busy loops, so the timing
//! constants have to be re-measured whenever the target clock changes.
//!
//! The whole frame, including the end-of-frame latch gap, is emitted inside
//! one `critical-section` region. Your platform has to provide a
//! critical-section implementation (most hals do). An interruption of more
//! than a few hundred nanoseconds desynchronizes the receiver and corrupts
//! the affected led and everything behind it in the chain, which is why
//! interrupts stay off from the first edge through the latch gap. The
//! blackout window grows with the chain, roughly 30 µs per led plus 50 µs
//! for the latch — keep that in mind before driving long chains from
//! interrupt-heavy applications.
//!
//! ```ignore
//! use smart_leds_trait::RGB8;
//! use ws2812_bitbang::{
//!     buffer::{led, PixelBuffer},
//!     Timing, Ws2812,
//! };
//!
//! // 48 MHz core, roughly three cpu cycles per delay-loop iteration
//! const TIMING: Timing = match Timing::new(48_000_000, 3) {
//!     Some(timing) => timing,
//!     None => panic!("clock too slow for ws2812"),
//! };
//!
//! let mut frame: PixelBuffer<48> = PixelBuffer::new(16)?;
//! frame.set_masked(led(1) | led(2), RGB8::new(255, 220, 0))?;
//!
//! let mut ws = Ws2812::new(pin, TIMING);
//! ws.transmit(&frame);
//! ```

// Timings for ws2812 from https://cpldcpu.files.wordpress.com/2014/01/ws2812_timing_table.png

#![no_std]

use embedded_hal as hal;

pub mod buffer;
pub mod timing;

use core::convert::Infallible;

use hal::digital::OutputPin;
use smart_leds_trait::{SmartLedsWrite, RGB8};

pub use buffer::PixelBuffer;
pub use timing::{CycleDelay, SpinDelay, Timing};

/// Errors reported by buffer construction and the checked color setters.
///
/// Transmission itself cannot fail: it allocates nothing and performs no
/// fallible I/O. A frame either completes inside its critical section, or
/// the chain displays garbage until the next complete transmit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// A chain of zero leds was requested.
    ZeroLeds,
    /// The buffer capacity is too small for the requested chain.
    CapacityExceeded,
    /// A mask bit or index selected a led beyond the chain.
    OutOfRange,
}

pub struct Ws2812<PIN, DELAY = SpinDelay> {
    pin: PIN,
    delay: DELAY,
    timing: Timing,
    enforce_latch: bool,
}

impl<PIN> Ws2812<PIN>
where
    PIN: OutputPin,
{
    /// Drive ws2812 devices on `pin`
    ///
    /// The pin is parked low immediately. Every frame ends with the ≥50 µs
    /// latch hold; use [`new_skip_latch`](Self::new_skip_latch) if your
    /// application paces frames itself.
    pub fn new(pin: PIN, timing: Timing) -> Self {
        Self::with_delay(pin, SpinDelay, timing)
    }

    /// Like [`new`](Self::new), but without the end-of-frame hold
    ///
    /// Only sound when the caller leaves the line idle for at least 50 µs
    /// between frames, otherwise the chain never latches.
    pub fn new_skip_latch(pin: PIN, timing: Timing) -> Self {
        Self::with_delay_skip_latch(pin, SpinDelay, timing)
    }
}

impl<PIN, DELAY> Ws2812<PIN, DELAY>
where
    PIN: OutputPin,
    DELAY: CycleDelay,
{
    /// [`new`](Self::new) with a caller-supplied delay primitive
    pub fn with_delay(mut pin: PIN, delay: DELAY, timing: Timing) -> Self {
        pin.set_low().ok();
        Self {
            pin,
            delay,
            timing,
            enforce_latch: true,
        }
    }

    /// [`new_skip_latch`](Self::new_skip_latch) with a caller-supplied delay
    /// primitive
    pub fn with_delay_skip_latch(mut pin: PIN, delay: DELAY, timing: Timing) -> Self {
        pin.set_low().ok();
        Self {
            pin,
            delay,
            timing,
            enforce_latch: false,
        }
    }

    /// Send a whole frame down the chain
    ///
    /// Emits 24 pulses per led in buffer order, most significant bit first,
    /// then holds the line low for the latch gap unless it was skipped at
    /// construction. Interrupts are off for the entire call. There is no
    /// partial success and no cancellation hook: aborting mid-frame would
    /// leave the chain in a half-shifted state nothing could detect.
    pub fn transmit<const CAP: usize>(&mut self, frame: &PixelBuffer<CAP>) {
        critical_section::with(|_| {
            for led in frame.as_bytes().chunks_exact(3) {
                self.write_byte(led[0]);
                self.write_byte(led[1]);
                self.write_byte(led[2]);
            }
            if self.enforce_latch {
                self.hold_reset();
            }
        });
    }

    /// Release the pin
    pub fn free(self) -> PIN {
        self.pin
    }

    /// Write a single byte for ws2812 devices, msb first
    fn write_byte(&mut self, mut data: u8) {
        // The length of the high phase decides between a one and a zero,
        // the pair together keeps the ~1.25 µs bit period.
        for _ in 0..8 {
            if (data & 0x80) != 0 {
                self.pin.set_high().ok();
                self.delay.delay_cycles(self.timing.one_high);
                self.pin.set_low().ok();
                self.delay.delay_cycles(self.timing.one_low);
            } else {
                self.pin.set_high().ok();
                self.delay.delay_cycles(self.timing.zero_high);
                self.pin.set_low().ok();
                self.delay.delay_cycles(self.timing.zero_low);
            }
            data <<= 1;
        }
    }

    fn hold_reset(&mut self) {
        // The line is already low after the last bit, keep it there.
        self.delay.delay_cycles(self.timing.reset);
    }
}

impl<PIN, DELAY> SmartLedsWrite for Ws2812<PIN, DELAY>
where
    PIN: OutputPin,
    DELAY: CycleDelay,
{
    type Error = Infallible;
    type Color = RGB8;
    /// Write all the items of an iterator to a ws2812 strip
    fn write<T, I>(&mut self, iterator: T) -> Result<(), Self::Error>
    where
        T: IntoIterator<Item = I>,
        I: Into<Self::Color>,
    {
        critical_section::with(|_| {
            for item in iterator {
                let item = item.into();
                self.write_byte(item.g);
                self.write_byte(item.r);
                self.write_byte(item.b);
            }
            if self.enforce_latch {
                self.hold_reset();
            }
        });
        Ok(())
    }
}
