//! Quadrature rotary encoder with push button, wired to one PCF8574.

use embedded_hal::i2c::I2c;
use log::trace;

use crate::config::EncoderPins;
use crate::error::ExpanderError;
use crate::expander::PortExpander;

/// Single-edge quadrature decoder plus button tracking.
///
/// Direction is resolved from the level of B sampled on each falling edge
/// of A, so one count is produced per detent. The button is active low.
///
/// Button polarity: a press (1 -> 0) sets [`click_pending`](Self::click_pending)
/// and clears [`button_held`](Self::button_held); a release (0 -> 1) clears the
/// pending click, restarts [`held_ticks`](Self::held_ticks) and sets
/// `button_held`. The naming reads inverted against the transitions but
/// matches deployed boards; confirm against the actual wiring before
/// relying on it.
pub struct RotaryEncoder<I2C> {
    expander: PortExpander<I2C>,
    pins: EncoderPins,
    last_sample: u8,
    counter: i32,
    button_held: bool,
    click_pending: bool,
    held_ticks: u32,
}

impl<I2C> RotaryEncoder<I2C>
where
    I2C: I2c,
{
    /// Drive A and B high so they float as inputs, then seed the sample.
    ///
    /// The write is the last port value read back with A and B set, not the
    /// previous latch. Any other line that reads low at this point, such as
    /// a button held during init, stays latched low until rewritten.
    pub fn new(
        mut expander: PortExpander<I2C>,
        pins: EncoderPins,
    ) -> Result<Self, ExpanderError<I2C::Error>> {
        if let Err(e) = pins.validate() {
            return Err(e.with_bus());
        }
        let idle = expander.last_value() | pins.quadrature_mask();
        expander.write(idle)?;
        let last_sample = expander.read()?;
        trace!(
            "encoder {:#04x} a={} b={} button={} seeded with {last_sample:#04x}",
            expander.address(),
            pins.a,
            pins.b,
            pins.button
        );
        Ok(Self {
            expander,
            pins,
            last_sample,
            counter: 0,
            button_held: false,
            click_pending: false,
            held_ticks: 0,
        })
    }

    /// Sample the port and advance the decoder by one step.
    pub fn handle_irq(&mut self) -> Result<(), ExpanderError<I2C::Error>> {
        let current = self.expander.sample()?;
        self.step(current);
        Ok(())
    }
}

impl<I2C> RotaryEncoder<I2C> {
    fn step(&mut self, current: u8) {
        let changed = self.last_sample ^ current;
        self.last_sample = current;

        let button = 1u8 << self.pins.button;
        if changed & button != 0 {
            if current & button == 0 {
                self.click_pending = true;
                self.button_held = false;
            } else {
                self.click_pending = false;
                self.held_ticks = 0;
                self.button_held = true;
            }
        }

        let a = 1u8 << self.pins.a;
        if changed & a != 0 && current & a == 0 {
            if current & (1 << self.pins.b) != 0 {
                self.counter = self.counter.wrapping_add(1);
            } else {
                self.counter = self.counter.wrapping_sub(1);
            }
            trace!("encoder counter={}", self.counter);
        }
    }

    pub fn tick(&mut self) {
        if self.button_held {
            self.held_ticks = self.held_ticks.wrapping_add(1);
        }
    }

    pub fn counter(&self) -> i32 {
        self.counter
    }

    pub fn set_counter(&mut self, value: i32) {
        self.counter = value;
    }

    pub fn button_held(&self) -> bool {
        self.button_held
    }

    pub fn click_pending(&self) -> bool {
        self.click_pending
    }

    pub fn take_click(&mut self) -> bool {
        std::mem::take(&mut self.click_pending)
    }

    pub fn held_ticks(&self) -> u32 {
        self.held_ticks
    }

    pub fn pins(&self) -> EncoderPins {
        self.pins
    }

    pub fn last_sample(&self) -> u8 {
        self.last_sample
    }

    pub fn expander(&self) -> &PortExpander<I2C> {
        &self.expander
    }

    /// Mutable access to the chip. Callbacks installed here are never
    /// dispatched while the encoder is registered.
    pub fn expander_mut(&mut self) -> &mut PortExpander<I2C> {
        &mut self.expander
    }

    pub fn into_inner(self) -> PortExpander<I2C> {
        self.expander
    }
}
