//! Control-loop to sample-interrupt handoff
//!
//! Everything the control loop tells the transmit interrupt goes through
//! one atomic word per channel, so the interrupt never sees a half-written
//! update and never waits on a lock:
//!
//! - [`ConfigCell`]: the whole [`ModulatorConfig`] packed into one `u32`
//! - [`TransmitGate`]: push-to-talk as a transition counter
//! - [`TuneRequest`]: a pending carrier retune
//!
//! The control loop is the only writer of each cell.

use core::sync::atomic::{AtomicU32, Ordering};

use crate::config::{DEFAULT_DRIVE, DEFAULT_MODE, DEFAULT_SIDETONE_VOLUME, DEFAULT_VOX_THRESHOLD};
use crate::types::{Bandwidth, Drive, Frequency, Mode, SidetonePitch, SidetoneVolume, VoxThreshold};

/// Operator settings read by the transmit chain every sample
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ModulatorConfig {
    /// Operating mode
    pub mode: Mode,
    /// Microphone drive shift
    pub drive: Drive,
    /// VOX trigger threshold
    pub vox_threshold: VoxThreshold,
    /// Maximum phase step setting
    pub bandwidth: Bandwidth,
    /// CW side-tone pitch
    pub sidetone_pitch: SidetonePitch,
    /// CW side-tone volume
    pub sidetone_volume: SidetoneVolume,
}

// Packed layout
const MODE_SHIFT: u32 = 0;
const DRIVE_SHIFT: u32 = 3;
const VOX_SHIFT: u32 = 7;
const BW_SHIFT: u32 = 15;
const PITCH_SHIFT: u32 = 17;
const VOLUME_SHIFT: u32 = 18;

impl ModulatorConfig {
    /// Start-up settings
    #[must_use]
    pub const fn new() -> Self {
        Self {
            mode: DEFAULT_MODE,
            drive: Drive::from_shift(DEFAULT_DRIVE),
            vox_threshold: VoxThreshold::new(DEFAULT_VOX_THRESHOLD),
            bandwidth: Bandwidth::Full,
            sidetone_pitch: SidetonePitch::Hz600,
            sidetone_volume: SidetoneVolume::new(DEFAULT_SIDETONE_VOLUME),
        }
    }

    /// Pack into a single word
    #[must_use]
    pub const fn pack(&self) -> u32 {
        let pitch = match self.sidetone_pitch {
            SidetonePitch::Hz600 => 0,
            SidetonePitch::Hz700 => 1,
        };
        ((self.mode.code() as u32 & 0x7) << MODE_SHIFT)
            | ((self.drive.shift() as u32 & 0xF) << DRIVE_SHIFT)
            | ((self.vox_threshold.level() as u32) << VOX_SHIFT)
            | ((self.bandwidth.code() as u32 & 0x3) << BW_SHIFT)
            | (pitch << PITCH_SHIFT)
            | ((self.sidetone_volume.level() as u32 & 0x1F) << VOLUME_SHIFT)
    }

    /// Unpack a word produced by [`pack`](Self::pack)
    ///
    /// Out-of-range fields are clamped or fall back to their defaults.
    #[must_use]
    pub const fn unpack(word: u32) -> Self {
        Self {
            mode: Mode::from_code(((word >> MODE_SHIFT) & 0x7) as u8),
            drive: Drive::from_shift(((word >> DRIVE_SHIFT) & 0xF) as u8),
            vox_threshold: VoxThreshold::new(((word >> VOX_SHIFT) & 0xFF) as u8),
            bandwidth: Bandwidth::from_code(((word >> BW_SHIFT) & 0x3) as u8),
            sidetone_pitch: if (word >> PITCH_SHIFT) & 1 == 0 {
                SidetonePitch::Hz600
            } else {
                SidetonePitch::Hz700
            },
            sidetone_volume: SidetoneVolume::new(((word >> VOLUME_SHIFT) & 0x1F) as u8),
        }
    }
}

impl Default for ModulatorConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "embedded")]
impl defmt::Format for ModulatorConfig {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(
            f,
            "{} drive={} vox={} {}",
            self.mode,
            self.drive,
            self.vox_threshold.level(),
            self.bandwidth
        );
    }
}

/// Single-word published configuration
pub struct ConfigCell {
    word: AtomicU32,
}

impl ConfigCell {
    /// Create a cell holding `config`
    #[must_use]
    pub const fn new(config: ModulatorConfig) -> Self {
        Self {
            word: AtomicU32::new(config.pack()),
        }
    }

    /// Publish a new configuration (control loop)
    pub fn publish(&self, config: ModulatorConfig) {
        self.word.store(config.pack(), Ordering::Release);
    }

    /// Read a consistent snapshot (interrupt)
    #[must_use]
    pub fn snapshot(&self) -> ModulatorConfig {
        ModulatorConfig::unpack(self.word.load(Ordering::Acquire))
    }

    /// Read-modify-publish from the control loop
    pub fn update(&self, f: impl FnOnce(&mut ModulatorConfig)) {
        let mut config = self.snapshot();
        f(&mut config);
        self.publish(config);
    }
}

/// Push-to-talk transition counter
///
/// Odd count means pressed. Each change of state increments the count, so
/// the reader can tell how many edges happened since it last looked.
pub struct TransmitGate {
    transitions: AtomicU32,
}

impl TransmitGate {
    /// Create a released gate
    #[must_use]
    pub const fn new() -> Self {
        Self {
            transitions: AtomicU32::new(0),
        }
    }

    /// Set the PTT state; repeated calls with the same state are no-ops
    pub fn set(&self, pressed: bool) {
        let _ = self
            .transitions
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |count| {
                (Self::count_is_pressed(count) != pressed).then(|| count.wrapping_add(1))
            });
    }

    /// Press PTT
    pub fn press(&self) {
        self.set(true);
    }

    /// Release PTT
    pub fn release(&self) {
        self.set(false);
    }

    /// Current PTT state
    #[must_use]
    pub fn is_pressed(&self) -> bool {
        Self::count_is_pressed(self.transitions())
    }

    /// Total transitions since start
    #[must_use]
    pub fn transitions(&self) -> u32 {
        self.transitions.load(Ordering::Acquire)
    }

    const fn count_is_pressed(count: u32) -> bool {
        count & 1 == 1
    }
}

impl Default for TransmitGate {
    fn default() -> Self {
        Self::new()
    }
}

/// Transitions observed since the previous poll
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GateChange {
    /// Number of edges since the previous poll
    pub edges: u32,
    /// PTT state after the last edge
    pub pressed: bool,
}

/// Reader-side cursor over a [`TransmitGate`]
///
/// Owned by the interrupt path.
#[derive(Clone, Copy, Debug, Default)]
pub struct GateCursor {
    seen: u32,
}

impl GateCursor {
    /// Cursor that has seen nothing yet
    #[must_use]
    pub const fn new() -> Self {
        Self { seen: 0 }
    }

    /// Consume all transitions since the previous poll
    pub fn poll(&mut self, gate: &TransmitGate) -> Option<GateChange> {
        let now = gate.transitions();
        let edges = now.wrapping_sub(self.seen);
        self.seen = now;
        (edges > 0).then_some(GateChange {
            edges,
            pressed: TransmitGate::count_is_pressed(now),
        })
    }
}

/// Pending carrier retune, in Hz (0 = none)
pub struct TuneRequest {
    hz: AtomicU32,
}

impl TuneRequest {
    /// Create with no pending request
    #[must_use]
    pub const fn new() -> Self {
        Self {
            hz: AtomicU32::new(0),
        }
    }

    /// Request a retune; replaces any request not yet applied
    pub fn request(&self, freq: Frequency) {
        self.hz.store(freq.as_hz(), Ordering::Release);
    }

    /// Take the pending request, if any
    pub fn take(&self) -> Option<Frequency> {
        Frequency::from_hz(self.hz.swap(0, Ordering::AcqRel))
    }

    /// Whether a request is waiting
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.hz.load(Ordering::Acquire) != 0
    }
}

impl Default for TuneRequest {
    fn default() -> Self {
        Self::new()
    }
}

/// All channels from the control loop to the transmit interrupt
///
/// Meant to live in a `static`.
pub struct ControlLink {
    /// Operator settings
    pub config: ConfigCell,
    /// Push-to-talk
    pub gate: TransmitGate,
    /// Pending carrier retune
    pub tune: TuneRequest,
}

impl ControlLink {
    /// Create a link with `config` published and PTT released
    #[must_use]
    pub const fn new(config: ModulatorConfig) -> Self {
        Self {
            config: ConfigCell::new(config),
            gate: TransmitGate::new(),
            tune: TuneRequest::new(),
        }
    }
}

impl Default for ControlLink {
    fn default() -> Self {
        Self::new(ModulatorConfig::default())
    }
}
