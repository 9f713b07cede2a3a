//! Channel mapping between device channels and output targets

use thiserror::Error;

use super::DeviceDescriptor;

/// Error when a channel map references a channel the device does not have,
/// or names no channels at all.
#[derive(Debug, Clone, Error)]
pub enum InvalidChannelMap {
    #[error(
        "Channel map references channel {index}, but device '{device}' has only {max_channels} input channels"
    )]
    IndexOutOfRange {
        index: usize,
        max_channels: u16,
        device: String,
    },

    #[error("Channel map for '{target}' names no channels")]
    Empty { target: &'static str },

    #[error("Invalid channel list \"{input}\": expected comma-separated channel indices (e.g. \"0,1\")")]
    Unparseable { input: String },
}

/// Named channel subsets for the routing targets.
///
/// The `mixed` target has no list of its own: it collapses `mic ++ system`
/// to stereo. Indices are zero-based and may overlap across targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelMap {
    pub mic: Vec<usize>,
    pub system: Vec<usize>,
}

impl ChannelMap {
    pub fn new(mic: Vec<usize>, system: Vec<usize>) -> Self {
        Self { mic, system }
    }

    /// Parse from the comma-separated lists stored in settings,
    /// e.g. mic `"2"`, system `"0,1"`.
    pub fn parse(mic: &str, system: &str) -> Result<Self, InvalidChannelMap> {
        Ok(Self {
            mic: parse_channel_list(mic)?,
            system: parse_channel_list(system)?,
        })
    }

    /// Channel list for the derived stereo mix: mic channels first,
    /// then system channels, preserving order.
    pub fn mixed(&self) -> Vec<usize> {
        self.mic.iter().chain(self.system.iter()).copied().collect()
    }

    /// Number of device channels the map requires (highest index + 1).
    pub fn required_channels(&self) -> usize {
        self.mic
            .iter()
            .chain(self.system.iter())
            .copied()
            .max()
            .map_or(0, |i| i + 1)
    }

    /// Validate eagerly against a live device descriptor, before any
    /// hardware or file resource is acquired.
    pub fn validate(&self, descriptor: &DeviceDescriptor) -> Result<(), InvalidChannelMap> {
        if self.mic.is_empty() {
            return Err(InvalidChannelMap::Empty { target: "mic" });
        }
        if self.system.is_empty() {
            return Err(InvalidChannelMap::Empty { target: "system" });
        }
        let max = descriptor.max_input_channels;
        for &index in self.mic.iter().chain(self.system.iter()) {
            if index >= max as usize {
                return Err(InvalidChannelMap::IndexOutOfRange {
                    index,
                    max_channels: max,
                    device: descriptor.name.clone(),
                });
            }
        }
        Ok(())
    }
}

impl Default for ChannelMap {
    /// Default mapping for an aggregate device carrying stereo system
    /// loopback on channels 0-1 and the microphone on channel 2.
    fn default() -> Self {
        Self {
            mic: vec![2],
            system: vec![0, 1],
        }
    }
}

fn parse_channel_list(input: &str) -> Result<Vec<usize>, InvalidChannelMap> {
    let indices: Result<Vec<usize>, _> = input
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(str::parse::<usize>)
        .collect();
    indices.map_err(|_| InvalidChannelMap::Unparseable {
        input: input.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(channels: u16) -> DeviceDescriptor {
        DeviceDescriptor {
            name: "Aggregate".into(),
            max_input_channels: channels,
            default_sample_rate: 48_000,
            supported_sample_rates: vec![44_100, 48_000],
        }
    }

    #[test]
    fn parse_channel_lists() {
        let map = ChannelMap::parse("2", "0, 1").unwrap();
        assert_eq!(map.mic, vec![2]);
        assert_eq!(map.system, vec![0, 1]);
    }

    #[test]
    fn parse_rejects_garbage() {
        let err = ChannelMap::parse("a,b", "0").unwrap_err();
        assert!(matches!(err, InvalidChannelMap::Unparseable { .. }));
    }

    #[test]
    fn mixed_concatenates_mic_then_system() {
        let map = ChannelMap::new(vec![2], vec![0, 1]);
        assert_eq!(map.mixed(), vec![2, 0, 1]);
    }

    #[test]
    fn required_channels_is_highest_index_plus_one() {
        let map = ChannelMap::new(vec![2], vec![0, 1]);
        assert_eq!(map.required_channels(), 3);
    }

    #[test]
    fn validate_accepts_in_range_indices() {
        let map = ChannelMap::default();
        assert!(map.validate(&descriptor(3)).is_ok());
    }

    #[test]
    fn validate_rejects_out_of_range_index() {
        let map = ChannelMap::new(vec![5], vec![0]);
        let err = map.validate(&descriptor(3)).unwrap_err();
        match err {
            InvalidChannelMap::IndexOutOfRange { index, max_channels, .. } => {
                assert_eq!(index, 5);
                assert_eq!(max_channels, 3);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn validate_rejects_empty_target() {
        let map = ChannelMap::new(vec![], vec![0]);
        assert!(matches!(
            map.validate(&descriptor(3)).unwrap_err(),
            InvalidChannelMap::Empty { target: "mic" }
        ));
    }

    #[test]
    fn overlapping_indices_are_allowed() {
        let map = ChannelMap::new(vec![0], vec![0, 1]);
        assert!(map.validate(&descriptor(2)).is_ok());
    }
}
