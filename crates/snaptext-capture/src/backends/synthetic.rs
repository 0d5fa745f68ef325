//! Generated frames for development and tests. No hardware involved;
//! the producer paces itself to roughly thirty frames per second and
//! keeps emitting until the stream is dropped.

use std::thread;
use std::time::Duration;

use snaptext_types::{Facing, RGBA_BYTES_PER_PIXEL, RgbaFrame};

use crate::config::Configuration;
use crate::core::{DynFrameProvider, FrameProvider, FrameStream, spawn_stream_from_channel};

const FRAME_INTERVAL: Duration = Duration::from_millis(33);

pub struct SyntheticProvider {
    width: u32,
    height: u32,
    facing: Facing,
    channel_capacity: usize,
}

impl SyntheticProvider {
    pub fn new(config: &Configuration, facing: Facing) -> Self {
        SyntheticProvider {
            width: config.width.max(1),
            height: config.height.max(1),
            facing,
            channel_capacity: config.channel_capacity(),
        }
    }
}

pub fn boxed(config: &Configuration, facing: Facing) -> DynFrameProvider {
    Box::new(SyntheticProvider::new(config, facing))
}

impl FrameProvider for SyntheticProvider {
    fn name(&self) -> &'static str {
        "synthetic"
    }

    fn into_stream(self: Box<Self>) -> FrameStream {
        let SyntheticProvider {
            width,
            height,
            facing,
            channel_capacity,
        } = *self;
        spawn_stream_from_channel(channel_capacity, move |tx| {
            let mut index: u64 = 0;
            loop {
                let frame = render_frame(width, height, facing, index);
                if tx.blocking_send(Ok(frame)).is_err() {
                    break;
                }
                index = index.wrapping_add(1);
                thread::sleep(FRAME_INTERVAL);
            }
        })
    }
}

/// Horizontal gradient that scrolls one row per frame. The front camera
/// inverts the blue channel so tests can tell the two devices apart.
fn render_frame(width: u32, height: u32, facing: Facing, index: u64) -> RgbaFrame {
    let mut data = Vec::with_capacity(width as usize * height as usize * RGBA_BYTES_PER_PIXEL);
    for row in 0..height {
        let value = ((row as u64 + index) % 256) as u8;
        let blue = match facing {
            Facing::Front => 255 - value,
            Facing::Rear => value,
        };
        for _col in 0..width {
            data.extend_from_slice(&[value, value, blue, 255]);
        }
    }
    RgbaFrame::from_owned(width, height, data)
        .unwrap_or_else(|_| unreachable!("synthetic frame dimensions are always valid"))
}
