//! Command Line Interface

use clap::Parser;
use clap_verbosity_flag::{InfoLevel, Verbosity};
use std::path::PathBuf;

/// Radius in meters applied to add intents that do not carry one
pub const DEFAULT_ZONE_RADIUS: f32 = 500.0;

#[derive(Parser, Debug)]
#[command(
    name = "ringfence-daemon",
    version,
    about = "Watches circular geofence zones and posts enter and leave notifications"
)]
pub struct Args {
    /// Read zone intents and location fixes from this file instead of stdin
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// Zone radius in meters for add intents without an explicit radius
    #[arg(short, long, default_value_t = DEFAULT_ZONE_RADIUS)]
    pub radius: f32,

    /// Run against a platform that denies location access
    #[arg(long)]
    pub deny_location: bool,

    #[command(flatten)]
    pub verbose: Verbosity<InfoLevel>,
}
