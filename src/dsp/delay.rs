/*
Circular Delay Line
===================

A fixed-capacity ring buffer of samples. Audio is written at a cursor that
advances modulo the buffer length; reads are taken at `write_pos - delay`,
also modulo length, so the read index is always normalized into [0, len) -
never negative, never past the end.

Two read flavors:

  read                Integer delay. Exact sample recall; the push/read
                      round-trip returns the written value bit-for-bit.

  read_interpolated   Fractional delay. Linearly interpolates between the
                      two nearest samples. Required whenever the delay time
                      is modulated (chorus, flanger) - truncating to whole
                      samples there produces zipper noise.

Delays beyond capacity are clamped to `len - 1` rather than rejected: the
render path must stay infallible, and callers size the line for their
maximum configured delay up front.

Capacity is fixed at construction. The only allocation happens in
`with_capacity`; `push`/`read`/`reset` are realtime-safe.
*/

pub struct DelayLine {
    buffer: Vec<f32>,
    write_pos: usize,
}

impl DelayLine {
    /// Allocate a line holding `capacity` samples of history. Capacity is
    /// raised to 1 if 0 is requested so the cursor math stays valid.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: vec![0.0; capacity.max(1)],
            write_pos: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        false // capacity is always >= 1
    }

    /// Write one sample and advance the cursor.
    #[inline]
    pub fn push(&mut self, sample: f32) {
        self.buffer[self.write_pos] = sample;
        self.write_pos = (self.write_pos + 1) % self.buffer.len();
    }

    /// Read the sample written `delay_samples` pushes ago. A delay of 0
    /// returns the oldest slot about to be overwritten... so callers read
    /// before they push, and `delay_samples` counts completed pushes.
    #[inline]
    pub fn read(&self, delay_samples: usize) -> f32 {
        let len = self.buffer.len();
        let delay = delay_samples.min(len - 1).max(1);
        self.buffer[(self.write_pos + len - delay) % len]
    }

    /// Read at a fractional delay, linearly interpolating between the two
    /// nearest integer positions. `delay_samples` is clamped into
    /// [1, len - 1].
    #[inline]
    pub fn read_interpolated(&self, delay_samples: f32) -> f32 {
        let len = self.buffer.len();
        // max-then-min so a capacity-1 line (bound 0) cannot invert the
        // clamp range and panic mid-render.
        let delay = if delay_samples.is_nan() {
            1.0
        } else {
            delay_samples.max(1.0).min((len - 1).max(1) as f32)
        };

        let whole = delay as usize;
        let frac = delay - whole as f32;

        let a = self.buffer[(self.write_pos + len - whole) % len];
        // One sample further back; wraps to the newest slot only when
        // delay is already pinned at len - 1, where frac is 0.
        let b = self.buffer[(self.write_pos + 2 * len - whole - 1) % len];

        a * (1.0 - frac) + b * frac
    }

    /// Zero the history and rewind the cursor. Called whenever the effect
    /// type or sample rate changes so stale samples cannot click through.
    pub fn reset(&mut self) {
        self.buffer.fill(0.0);
        self.write_pos = 0;
    }
}
