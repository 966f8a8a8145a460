//! Single-attribute aggregation.
//!
//! An attribute is a signed 32-bit value aggregated across ordered channels.
//! Each channel holds a flat sum, a percent sum (in percent points, so `25`
//! means `+25%`) and an optional override; channel `k` consumes channel
//! `k-1`'s result as its input base:
//!
//! ```text
//! in_0     = base_value
//! in_{k+1} = override_k.unwrap_or((in_k + flat_k) * (100 + percent_k) / 100)
//! current  = clamp(in_C, min, max)
//! ```
//!
//! All arithmetic is integral (i64 intermediates, truncating division), so
//! aggregation is deterministic and order-independent within a channel.

use crate::core::AttributeError;

/// One aggregation stage of an attribute.
#[derive(Debug, Clone, Default)]
pub(crate) struct Channel {
    flat_sum: i64,
    percent_sum: i64,
    // Overrides stack; the most recent one wins until it is withdrawn.
    overrides: Vec<i32>,
}

impl Channel {
    fn override_value(&self) -> Option<i32> {
        self.overrides.last().copied()
    }

    fn is_neutral(&self) -> bool {
        self.flat_sum == 0 && self.percent_sum == 0 && self.overrides.is_empty()
    }
}

/// A clamped integer attribute with layered modifier aggregation.
///
/// Mutations only mark the attribute dirty; the published `current_value`
/// moves when [`apply_pending`](Attribute::apply_pending) runs, which the
/// owning set batches once per public engine operation. Callers therefore
/// never observe intermediate values mid-mutation.
#[derive(Debug, Clone)]
pub struct Attribute {
    base_value: i32,
    current_value: i32,
    min: i32,
    max: i32,
    channels: Vec<Channel>,
    dirty: bool,
}

impl Attribute {
    /// Creates an attribute with one aggregation channel.
    pub fn new(initial: i32, min: i32, max: i32) -> Self {
        Self::with_channels(initial, min, max, 1)
    }

    /// Creates an attribute with `channels` ordered aggregation channels.
    pub fn with_channels(initial: i32, min: i32, max: i32, channels: usize) -> Self {
        debug_assert!(min <= max, "attribute bounds inverted");
        debug_assert!(channels >= 1, "attribute needs at least one channel");
        let base_value = initial.clamp(min, max);
        Self {
            base_value,
            current_value: base_value,
            min,
            max,
            channels: vec![Channel::default(); channels.max(1)],
            dirty: false,
        }
    }

    /// The last published value. Always within `[min, max]`.
    pub fn current_value(&self) -> i32 {
        self.current_value
    }

    pub fn base_value(&self) -> i32 {
        self.base_value
    }

    pub fn min(&self) -> i32 {
        self.min
    }

    pub fn max(&self) -> i32 {
        self.max
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// The aggregated modifier contribution: `current - base`.
    pub fn modifier_value(&self) -> i32 {
        self.current_value - self.base_value
    }

    /// True when no channel carries any modifier.
    pub fn has_no_modifiers(&self) -> bool {
        self.channels.iter().all(Channel::is_neutral)
    }

    fn channel_mut(&mut self, channel: usize) -> Result<&mut Channel, AttributeError> {
        let channels = self.channels.len();
        self.channels
            .get_mut(channel)
            .ok_or(AttributeError::ChannelOutOfRange { channel, channels })
    }

    /// Adds `value` to the flat sum of `channel`.
    pub fn add_flat_modifier(&mut self, channel: usize, value: i32) -> Result<(), AttributeError> {
        self.channel_mut(channel)?.flat_sum += value as i64;
        self.dirty = true;
        Ok(())
    }

    /// Withdraws a previously added flat modifier.
    pub fn remove_flat_modifier(
        &mut self,
        channel: usize,
        value: i32,
    ) -> Result<(), AttributeError> {
        self.channel_mut(channel)?.flat_sum -= value as i64;
        self.dirty = true;
        Ok(())
    }

    /// Adds `value` percent points to `channel` (`25` means `+25%`).
    pub fn add_percent_modifier(
        &mut self,
        channel: usize,
        value: i32,
    ) -> Result<(), AttributeError> {
        self.channel_mut(channel)?.percent_sum += value as i64;
        self.dirty = true;
        Ok(())
    }

    /// Withdraws a previously added percent modifier.
    pub fn remove_percent_modifier(
        &mut self,
        channel: usize,
        value: i32,
    ) -> Result<(), AttributeError> {
        self.channel_mut(channel)?.percent_sum -= value as i64;
        self.dirty = true;
        Ok(())
    }

    /// Pushes an override onto `channel`; the latest override wins.
    pub fn set_override(&mut self, channel: usize, value: i32) -> Result<(), AttributeError> {
        self.channel_mut(channel)?.overrides.push(value);
        self.dirty = true;
        Ok(())
    }

    /// Withdraws one override of the given value (latest first).
    pub fn clear_override(&mut self, channel: usize, value: i32) -> Result<(), AttributeError> {
        let overrides = &mut self.channel_mut(channel)?.overrides;
        if let Some(position) = overrides.iter().rposition(|&v| v == value) {
            overrides.remove(position);
        }
        self.dirty = true;
        Ok(())
    }

    /// Permanently adds `value` to the base value.
    ///
    /// Returns the applied base delta after clamping.
    pub fn execute_flat(&mut self, value: i32) -> i32 {
        let old = self.base_value;
        self.base_value = (old as i64 + value as i64).clamp(self.min as i64, self.max as i64) as i32;
        self.dirty = true;
        self.base_value - old
    }

    /// Permanently replaces the base value.
    ///
    /// Returns the applied base delta after clamping.
    pub fn execute_override(&mut self, value: i32) -> i32 {
        let old = self.base_value;
        self.base_value = value.clamp(self.min, self.max);
        self.dirty = true;
        self.base_value - old
    }

    pub fn set_min(&mut self, min: i32) {
        self.min = min;
        self.base_value = self.base_value.clamp(self.min, self.max);
        self.dirty = true;
    }

    pub fn set_max(&mut self, max: i32) {
        self.max = max;
        self.base_value = self.base_value.clamp(self.min, self.max);
        self.dirty = true;
    }

    /// Evaluates the channel pipeline without publishing.
    pub fn computed_value(&self) -> i32 {
        let mut value = self.base_value as i64;
        for channel in &self.channels {
            value = match channel.override_value() {
                Some(override_value) => override_value as i64,
                None => (value + channel.flat_sum) * (100 + channel.percent_sum) / 100,
            };
        }
        value.clamp(self.min as i64, self.max as i64) as i32
    }

    /// The unpublished delta that `apply_pending` would publish now.
    pub fn pending_delta(&self) -> i32 {
        self.computed_value() - self.current_value
    }

    pub(crate) fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Publishes the computed value. Returns `(old, new)` when it moved.
    pub(crate) fn apply_pending(&mut self) -> Option<(i32, i32)> {
        self.dirty = false;
        let new = self.computed_value();
        let old = self.current_value;
        if new == old {
            return None;
        }
        self.current_value = new;
        Some((old, new))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flat_and_percent_aggregate_per_channel() {
        let mut attr = Attribute::new(100, 0, 1000);
        attr.add_flat_modifier(0, 20).unwrap();
        attr.add_percent_modifier(0, 50).unwrap();

        // (100 + 20) * 150% = 180
        assert_eq!(attr.computed_value(), 180);
        // Not yet published.
        assert_eq!(attr.current_value(), 100);

        assert_eq!(attr.apply_pending(), Some((100, 180)));
        assert_eq!(attr.current_value(), 180);
        assert_eq!(attr.modifier_value(), 80);
    }

    #[test]
    fn channels_feed_forward() {
        let mut attr = Attribute::with_channels(100, 0, 10_000, 2);
        attr.add_flat_modifier(0, 100).unwrap();
        attr.add_percent_modifier(1, 10).unwrap();

        // Channel 0: 200, channel 1: 200 * 110% = 220.
        assert_eq!(attr.computed_value(), 220);
    }

    #[test]
    fn override_wins_and_withdraws_lifo() {
        let mut attr = Attribute::new(10, 0, 100);
        attr.set_override(0, 50).unwrap();
        attr.set_override(0, 70).unwrap();
        assert_eq!(attr.computed_value(), 70);

        attr.clear_override(0, 70).unwrap();
        assert_eq!(attr.computed_value(), 50);
        attr.clear_override(0, 50).unwrap();
        assert_eq!(attr.computed_value(), 10);
    }

    #[test]
    fn clamping_holds_at_every_observable_point() {
        let mut attr = Attribute::new(90, 0, 100);
        attr.add_flat_modifier(0, 50).unwrap();
        attr.apply_pending();
        assert_eq!(attr.current_value(), 100);

        attr.remove_flat_modifier(0, 50).unwrap();
        attr.apply_pending();
        assert_eq!(attr.current_value(), 90);
    }

    #[test]
    fn executes_mutate_base_within_bounds() {
        let mut attr = Attribute::new(100, 0, 100);
        assert_eq!(attr.execute_flat(-30), -30);
        assert_eq!(attr.base_value(), 70);

        // Clamped at the bound; the returned delta reflects what applied.
        assert_eq!(attr.execute_flat(200), 30);
        assert_eq!(attr.base_value(), 100);

        assert_eq!(attr.execute_override(40), -60);
        assert_eq!(attr.base_value(), 40);
    }

    #[test]
    fn bound_changes_reclamp() {
        let mut attr = Attribute::new(100, 0, 100);
        attr.set_max(80);
        attr.apply_pending();
        assert_eq!(attr.base_value(), 80);
        assert_eq!(attr.current_value(), 80);
    }

    #[test]
    fn channel_out_of_range_errors() {
        let mut attr = Attribute::new(0, 0, 10);
        let err = attr.add_flat_modifier(2, 1).unwrap_err();
        assert_eq!(
            err,
            AttributeError::ChannelOutOfRange {
                channel: 2,
                channels: 1
            }
        );
    }

    #[test]
    fn unchanged_publish_reports_nothing() {
        let mut attr = Attribute::new(50, 0, 100);
        attr.add_flat_modifier(0, 0).unwrap();
        assert_eq!(attr.apply_pending(), None);
    }
}
