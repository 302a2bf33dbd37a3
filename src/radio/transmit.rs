//! Transmit Control
//!
//! The per-sample transmit orchestrator. [`Transmitter::tick`] runs once
//! per sample-clock event at interrupt priority and never blocks or fails:
//! every fault degrades to "carrier off".
//!
//! # Tick order
//!
//! 1. Bulk-write the synthesizer block staged by the previous tick
//! 2. Commit the previous tick's amplitude (and side tone)
//! 3. Read one microphone sample
//! 4. Encode it for the active mode
//! 5. Gate, shape and limit; stage the results for the next tick
//!
//! Staging one tick ahead hides the bus transfer behind the following
//! sample's compute time. The two stages live in a double buffer.
//!
//! # Carrier enable
//!
//! The output-enable register is written only on boundaries. Every
//! transmit-gate on-edge enables the carrier. In SSB the on-edge also arms
//! the VOX gate with a full hang time, so the carrier drops after
//! [`CarrierGate::HANG_TICKS`] silent samples; a later fresh trigger enables
//! it again. Every off-edge disables it unconditionally.

use embedded_hal::i2c::I2c;
use embedded_hal::pwm::SetDutyCycle;

use super::handoff::{ControlLink, GateChange, GateCursor, ModulatorConfig};
use super::vox::{CarrierGate, GateEdge, Trigger};
use crate::drivers::si5351::Si5351;
use crate::dsp::amplitude::{AmplitudeLut, AmplitudeShaper};
use crate::dsp::modulation::{Encoded, SampleProcessor};
use crate::dsp::phase::PhaseRateLimiter;
use crate::dsp::si5351_calc::SynthRegisters;
use crate::hal::SampleSource;
use crate::types::{Mode, TxRxState};

/// PWM full-scale denominator for 8-bit levels
const PWM_DENOM: u16 = 255;

/// Transmit state machine
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum TxState {
    /// Transmit gate released
    #[default]
    Idle,
    /// Transmitting in the mode latched at the on-edge
    Transmit(Mode),
}

impl TxState {
    /// Convert to `TxRxState`
    #[must_use]
    pub const fn as_txrx(self) -> TxRxState {
        match self {
            Self::Idle => TxRxState::Rx,
            Self::Transmit(_) => TxRxState::Tx,
        }
    }

    /// Check if transmitting
    #[must_use]
    pub const fn is_transmitting(self) -> bool {
        matches!(self, Self::Transmit(_))
    }

    /// Latched mode while transmitting
    #[must_use]
    pub const fn mode(self) -> Option<Mode> {
        match self {
            Self::Idle => None,
            Self::Transmit(mode) => Some(mode),
        }
    }
}

#[cfg(feature = "embedded")]
impl defmt::Format for TxState {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Self::Idle => defmt::write!(f, "IDLE"),
            Self::Transmit(mode) => defmt::write!(f, "TX {}", mode),
        }
    }
}

/// Error and traffic counters, never reset by the tick
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TxDiagnostics {
    /// Failed synthesizer bus transfers
    pub bus_errors: u32,
    /// Failed PWM writes
    pub pwm_errors: u32,
    /// Synthesizer bulk writes attempted
    pub bulk_writes: u32,
    /// Output-enable register writes attempted
    pub enable_writes: u32,
    /// Carrier faults latched
    pub faults: u32,
}

#[cfg(feature = "embedded")]
impl defmt::Format for TxDiagnostics {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(
            f,
            "bus_err={} pwm_err={} bulk={} oe={} faults={}",
            self.bus_errors,
            self.pwm_errors,
            self.bulk_writes,
            self.enable_writes,
            self.faults
        );
    }
}

/// What one tick computed
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TickReport {
    /// State after the tick
    pub state: TxState,
    /// Whether the carrier is enabled after the tick
    pub carrier_enabled: bool,
    /// PWM level staged for the next tick
    pub amplitude: u8,
    /// Carrier offset staged for the next tick, in Hz
    pub freq_delta: i32,
    /// Side-tone level staged for the next tick (CW only)
    pub sidetone: Option<u8>,
    /// VOX trigger seen this tick (SSB only)
    pub trigger: Trigger,
}

impl TickReport {
    const fn idle(carrier_enabled: bool) -> Self {
        Self {
            state: TxState::Idle,
            carrier_enabled,
            amplitude: 0,
            freq_delta: 0,
            sidetone: None,
            trigger: Trigger::None,
        }
    }
}

/// Outputs computed by one tick and committed by the next
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
struct Stage {
    regs: Option<SynthRegisters>,
    amplitude: u8,
    sidetone: Option<u8>,
}

impl Stage {
    const OFF: Self = Self {
        regs: None,
        amplitude: 0,
        sidetone: None,
    };
}

/// Two-slot pipeline: the front slot is committed, the back slot is staged
#[derive(Clone, Copy, Debug)]
struct Pipeline {
    slots: [Stage; 2],
    back: usize,
}

impl Pipeline {
    const fn new() -> Self {
        Self {
            slots: [Stage::OFF; 2],
            back: 0,
        }
    }

    fn front(&self) -> Stage {
        self.slots[self.back ^ 1]
    }

    fn stage(&mut self, stage: Stage) {
        self.slots[self.back] = stage;
        self.back ^= 1;
    }

    fn clear(&mut self) {
        self.slots = [Stage::OFF; 2];
    }
}

/// Carrier-enable fault latch
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
enum Fault {
    #[default]
    None,
    /// Output forced off; disable write still owed
    DisablePending,
    /// Output forced off until the next on-edge
    Latched,
}

/// Per-sample transmit orchestrator
///
/// Owns every piece of transmit state. The control loop reaches it only
/// through the [`ControlLink`] passed to [`tick`](Self::tick).
pub struct Transmitter<B, A, S, M> {
    synth: Si5351<B>,
    amplitude_out: A,
    sidetone_out: S,
    mic: M,
    processor: SampleProcessor,
    shaper: AmplitudeShaper,
    limiter: PhaseRateLimiter,
    gate: CarrierGate,
    cursor: GateCursor,
    state: TxState,
    pipeline: Pipeline,
    fault: Fault,
    diagnostics: TxDiagnostics,
}

impl<B, A, S, M> Transmitter<B, A, S, M>
where
    B: I2c,
    A: SetDutyCycle,
    S: SetDutyCycle,
    M: SampleSource,
{
    /// Assemble a transmitter
    ///
    /// The synthesizer should already be initialized with a carrier set;
    /// without one the frequency path stays silent.
    pub fn new(synth: Si5351<B>, amplitude_out: A, sidetone_out: S, mic: M, lut: AmplitudeLut) -> Self {
        let config = ModulatorConfig::default();
        Self {
            synth,
            amplitude_out,
            sidetone_out,
            mic,
            processor: SampleProcessor::new(config.sidetone_pitch),
            shaper: AmplitudeShaper::new(lut),
            limiter: PhaseRateLimiter::new(config.bandwidth),
            gate: CarrierGate::new(),
            cursor: GateCursor::new(),
            state: TxState::Idle,
            pipeline: Pipeline::new(),
            fault: Fault::None,
            diagnostics: TxDiagnostics::default(),
        }
    }

    /// Run one sample period
    pub fn tick(&mut self, link: &ControlLink) -> TickReport {
        let config = link.config.snapshot();
        self.limiter.set_bandwidth(config.bandwidth);
        self.processor.set_pitch(config.sidetone_pitch);

        if let Some(change) = self.cursor.poll(&link.gate) {
            self.on_gate_change(change, config.mode);
        }

        if let TxState::Transmit(mode) = self.state {
            if mode != config.mode {
                self.key_up();
                self.key_down(config.mode);
            }
        }

        if self.fault == Fault::DisablePending {
            self.retry_disable();
        }

        match self.state {
            TxState::Idle => {
                if let Some(freq) = link.tune.take() {
                    if self.synth.set_carrier(freq).is_err() {
                        self.diagnostics.bus_errors += 1;
                    }
                }
                TickReport::idle(self.synth.is_output_enabled())
            }
            TxState::Transmit(mode) => self.transmit(mode, &config),
        }
    }

    fn transmit(&mut self, mode: Mode, config: &ModulatorConfig) -> TickReport {
        // 1-2: commit what the previous tick staged
        let front = self.pipeline.front();
        if let Some(regs) = front.regs {
            self.diagnostics.bulk_writes += 1;
            if self.synth.write_bulk(&regs).is_err() {
                self.diagnostics.bus_errors += 1;
            }
        }
        self.write_amplitude(front.amplitude);
        if let Some(level) = front.sidetone {
            self.write_sidetone(level);
        }

        // 3-4: read and encode
        let sample = if mode == Mode::Cw {
            0
        } else {
            self.mic.read_sample()
        };
        let encoded = self
            .processor
            .encode(mode, sample, config.drive, config.sidetone_volume);

        // 5: gate, shape, limit
        let mut trigger = Trigger::None;
        let mut freq_delta = 0;
        let mut stage = match encoded {
            Encoded::Voice(polar) => {
                let triggered = config.vox_threshold.is_triggered_by(polar.magnitude);
                let (seen, edge) = self.gate.step(triggered);
                trigger = seen;
                match edge {
                    Some(GateEdge::Opened) if self.fault == Fault::None => self.write_enable(true),
                    Some(GateEdge::Closed) => {
                        self.write_amplitude(0);
                        self.write_enable(false);
                    }
                    _ => {}
                }

                let carrier_on = self.gate.is_enabled();
                freq_delta = self.limiter.process(polar.phase, mode);
                Stage {
                    regs: if carrier_on {
                        self.synth.compute_registers(freq_delta)
                    } else {
                        None
                    },
                    amplitude: self.shaper.voice_level(polar.magnitude, config.drive, carrier_on),
                    sidetone: None,
                }
            }
            Encoded::Envelope(level) => Stage {
                amplitude: level,
                ..Stage::OFF
            },
            Encoded::Deviation(df) => {
                freq_delta = df;
                Stage {
                    regs: self.synth.compute_registers(df),
                    amplitude: self.shaper.full_level(),
                    sidetone: None,
                }
            }
            Encoded::Keyed { sidetone } => Stage {
                amplitude: self.shaper.keyed_level(),
                sidetone: Some(sidetone),
                ..Stage::OFF
            },
        };

        if self.fault != Fault::None {
            stage = Stage {
                sidetone: stage.sidetone,
                ..Stage::OFF
            };
            freq_delta = 0;
        }
        self.pipeline.stage(stage);

        TickReport {
            state: self.state,
            carrier_enabled: self.carrier_enabled(),
            amplitude: stage.amplitude,
            freq_delta,
            sidetone: stage.sidetone,
            trigger,
        }
    }

    fn on_gate_change(&mut self, change: GateChange, mode: Mode) {
        #[cfg(feature = "embedded")]
        defmt::debug!("PTT {} ({} edges)", change.pressed, change.edges);

        // Any edge seen while transmitting includes a release
        if self.state.is_transmitting() {
            self.key_up();
        }
        if change.pressed {
            self.key_down(mode);
        }
    }

    /// Transmit-gate on-edge
    fn key_down(&mut self, mode: Mode) {
        self.state = TxState::Transmit(mode);
        if mode.uses_vox() {
            self.gate.arm();
        } else {
            self.gate.reset();
        }
        self.shaper.rearm();
        self.limiter.reset();
        self.processor.reset();
        self.pipeline.clear();
        self.fault = Fault::None;

        self.write_enable(true);
    }

    /// Transmit-gate off-edge: amplitude to zero and carrier off, at once
    fn key_up(&mut self) {
        self.write_amplitude(0);
        self.write_enable(false);
        self.pipeline.clear();
        self.shaper.rearm();
        self.gate.reset();
        self.state = TxState::Idle;
    }

    fn write_amplitude(&mut self, level: u8) {
        if self
            .amplitude_out
            .set_duty_cycle_fraction(u16::from(level), PWM_DENOM)
            .is_err()
        {
            self.diagnostics.pwm_errors += 1;
        }
    }

    fn write_sidetone(&mut self, level: u8) {
        if self
            .sidetone_out
            .set_duty_cycle_fraction(u16::from(level), PWM_DENOM)
            .is_err()
        {
            self.diagnostics.pwm_errors += 1;
        }
    }

    fn write_enable(&mut self, enabled: bool) {
        self.diagnostics.enable_writes += 1;
        if self.synth.set_output_enabled(enabled).is_ok() {
            return;
        }
        self.diagnostics.bus_errors += 1;
        self.diagnostics.faults += 1;
        self.fault = Fault::DisablePending;
        self.write_amplitude(0);

        #[cfg(feature = "embedded")]
        defmt::warn!("carrier enable write failed, forcing carrier off");
    }

    fn retry_disable(&mut self) {
        self.diagnostics.enable_writes += 1;
        if self.synth.set_output_enabled(false).is_ok() {
            self.fault = Fault::Latched;
        } else {
            self.diagnostics.bus_errors += 1;
        }
        self.write_amplitude(0);
    }

    /// Whether the carrier is currently enabled
    #[must_use]
    pub fn carrier_enabled(&self) -> bool {
        match self.state {
            TxState::Idle => false,
            _ if self.fault != Fault::None => false,
            TxState::Transmit(mode) if mode.uses_vox() => self.gate.is_enabled(),
            TxState::Transmit(_) => true,
        }
    }

    /// Current state
    #[must_use]
    pub const fn state(&self) -> TxState {
        self.state
    }

    /// Whether a carrier fault is forcing the output off
    #[must_use]
    pub fn is_faulted(&self) -> bool {
        self.fault != Fault::None
    }

    /// Error and traffic counters
    #[must_use]
    pub const fn diagnostics(&self) -> &TxDiagnostics {
        &self.diagnostics
    }

    /// VOX gate
    #[must_use]
    pub const fn carrier_gate(&self) -> &CarrierGate {
        &self.gate
    }

    /// Phase limiter
    #[must_use]
    pub const fn limiter(&self) -> &PhaseRateLimiter {
        &self.limiter
    }

    /// Amplitude shaper
    #[must_use]
    pub const fn shaper(&self) -> &AmplitudeShaper {
        &self.shaper
    }

    /// Swap in a rebuilt level table
    pub fn set_lut(&mut self, lut: AmplitudeLut) {
        self.shaper.set_lut(lut);
    }

    /// Synthesizer driver
    #[must_use]
    pub const fn synth(&self) -> &Si5351<B> {
        &self.synth
    }

    /// Mutable synthesizer driver (set-up while idle)
    pub fn synth_mut(&mut self) -> &mut Si5351<B> {
        &mut self.synth
    }

    /// Amplitude PWM output
    #[must_use]
    pub const fn amplitude_output(&self) -> &A {
        &self.amplitude_out
    }

    /// Side-tone PWM output
    #[must_use]
    pub const fn sidetone_output(&self) -> &S {
        &self.sidetone_out
    }

    /// Microphone source
    pub fn mic_mut(&mut self) -> &mut M {
        &mut self.mic
    }
}
