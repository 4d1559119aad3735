//! Walkthrough of the store used by the `demo` and `snapshot` commands.

use rand::Rng;
use serde::Serialize;
use tracing::info;

use crate::channel::Channel;
use crate::element::ChannelElement;
use crate::error::Result;
use crate::manager::ChannelManager;
use crate::map::MultiChannelMap;
use crate::variant::VariantChannel;

fn filled<T: ChannelElement>(num_elements: usize, width: usize, value: T) -> Result<Channel<T>> {
    let channel = Channel::new(num_elements, width)?;
    channel.fill(value)?;
    Ok(channel)
}

/// What the walkthrough observed, for printing or asserting on.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DemoReport {
    pub total_channels: usize,
    pub float_keys: Vec<String>,
    pub copied_float_channels: usize,
    pub erased_float_channels: usize,
    pub remaining_channels: usize,
    pub remaining_uchar_keys: Vec<String>,
    pub atomic: f32,
}

/// Point cloud manager with positions, normals, colors, a hyperspectral
/// block of random bytes and a voxel size atomic.
pub fn build_demo_manager(num_points: usize) -> Result<ChannelManager> {
    let points = filled(num_points, 3, 0.0f32)?;
    let normals = filled(num_points, 3, 1.0f32)?;
    let colors = filled(num_points, 3, 255u8)?;

    let hyper = Channel::<u8>::new(600, 600)?;
    {
        let mut rng = rand::rng();
        let mut data = hyper.data_mut()?;
        rng.fill(&mut data[..]);
    }

    let mut cm = ChannelManager::from_pairs(vec![
        ("points2", VariantChannel::from(points.clone())),
        ("hyper", VariantChannel::from(hyper)),
    ])?;
    cm.entry_or_default("points")?.assign(points);
    cm.entry_or_default("colors")?.assign(colors);
    cm.entry_or_default("normals")?.assign(normals);
    cm.add_float_atomic(5.5, "myatomic")?;
    Ok(cm)
}

/// Runs the full walkthrough: lookups, typed iteration, copying floats into a
/// second manager and erasing them from the first.
pub fn run_demo(num_points: usize) -> Result<DemoReport> {
    let mut cm = build_demo_manager(num_points)?;

    for (key, channel) in cm.iter() {
        info!("{key}: {channel}");
    }

    let points = cm.get::<f32>("points")?;
    info!("points: {} x {}", points.num_elements(), points.width());
    if cm.get_optional::<f32>("hello world").is_none() {
        info!("the channel 'hello world' doesn't exist");
    }

    let cursor = cm.find("points");
    if let Some((key, value)) = cm.entry_at(&cursor) {
        info!("{key} found, type index {}", value.type_index());
    }

    let atomic = cm.get_float_atomic("myatomic")?;
    let total_channels = cm.len();
    let float_keys = cm.keys::<f32>();
    info!(total_channels, floats = cm.num_channels::<f32>(), "channel manager filled");

    let mut floats = MultiChannelMap::new();
    let copied_float_channels = floats.extend_typed_from::<f32>(&cm);

    let mut erased_float_channels = 0;
    let mut cursor = cm.typed_begin::<f32>();
    while cursor != cm.end() {
        info!("remove {}", cursor.key().unwrap_or_default());
        cursor = cm.erase_at(cursor);
        erased_float_channels += 1;
    }

    let remaining_uchar_keys = cm.keys::<u8>();
    info!("remaining channels:\n{}", *cm);

    Ok(DemoReport {
        total_channels,
        float_keys,
        copied_float_channels,
        erased_float_channels,
        remaining_channels: cm.len(),
        remaining_uchar_keys,
        atomic,
    })
}
