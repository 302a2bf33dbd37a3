//! Modulation Tests
//!
//! Per-mode encoders and the SSB front end, driven with synthetic tones.
//! Run with: cargo test --test modulation_tests

mod common;

use common::tone;
use phase_ampl_tx::config::{AM_BASE, FAST_TUNING_SPAN_HZ, TX_SAMPLE_RATE};
use phase_ampl_tx::dsp::filter::{HilbertTransform, IqSample, MicConditioner, SsbFrontEnd};
use phase_ampl_tx::dsp::modulation::{Encoded, Polar, SampleProcessor};
use phase_ampl_tx::dsp::oscillator::ToneOscillator;
use phase_ampl_tx::dsp::phase::PhaseRateLimiter;
use phase_ampl_tx::types::{Bandwidth, Drive, Mode, SidetonePitch, SidetoneVolume};

/// Frequency offsets produced for a tone once the filters have settled
fn ssb_offsets(freq_hz: f64, mode: Mode) -> Vec<i32> {
    let mut proc = SampleProcessor::default();
    let mut lim = PhaseRateLimiter::new(Bandwidth::Full);
    tone(freq_hz, 1000.0, TX_SAMPLE_RATE, 400)
        .into_iter()
        .map(|s| lim.process(proc.ssb(s).phase, mode))
        .skip(50)
        .collect()
}

// =============================================================================
// Front end
// =============================================================================

#[test]
fn test_conditioner_removes_offset() {
    let mut cond = MicConditioner::new();
    let out: Vec<i16> = (0..400).map(|_| cond.process(-700)).collect();
    assert!(out[399].abs() <= 2);
}

#[test]
fn test_hilbert_quadrature_of_tone() {
    let mut hilbert = HilbertTransform::new();
    let samples = tone(1000.0, 1000.0, TX_SAMPLE_RATE, 400);
    let out: Vec<IqSample> = samples.iter().map(|&s| hilbert.process(s)).collect();
    // I and Q carry the same energy within ~10%
    let energy = |f: fn(&IqSample) -> i16| -> f64 {
        out[50..].iter().map(|s| f64::from(f(s)).powi(2)).sum()
    };
    let ratio = energy(|s| s.q) / energy(|s| s.i);
    assert!((0.8..1.25).contains(&ratio), "Q/I energy {ratio}");
}

#[test]
fn test_front_end_reset() {
    let mut fe = SsbFrontEnd::new();
    for s in tone(700.0, 2000.0, TX_SAMPLE_RATE, 30) {
        fe.process(s);
    }
    fe.reset();
    assert_eq!(fe.process(0), IqSample::default());
}

// =============================================================================
// SSB
// =============================================================================

#[test]
fn test_usb_tone_maps_to_positive_offset() {
    for freq in [500.0, 1000.0, 1500.0] {
        for df in ssb_offsets(freq, Mode::Usb) {
            assert!(
                (f64::from(df) - freq).abs() <= 40.0,
                "{freq} Hz tone gave {df} Hz"
            );
        }
    }
}

#[test]
fn test_lsb_tone_maps_to_negative_offset() {
    for df in ssb_offsets(1000.0, Mode::Lsb) {
        assert!((-1040..=-960).contains(&df), "LSB offset {df}");
    }
}

#[test]
fn test_ssb_magnitude_follows_level() {
    let mut proc = SampleProcessor::default();
    let mags: Vec<u16> = tone(1000.0, 1000.0, TX_SAMPLE_RATE, 400)
        .into_iter()
        .map(|s| proc.ssb(s).magnitude)
        .skip(50)
        .collect();
    assert!(mags.iter().all(|&m| (1_300..=1_900).contains(&m)));

    let mut proc = SampleProcessor::default();
    let quiet: Vec<u16> = tone(1000.0, 100.0, TX_SAMPLE_RATE, 400)
        .into_iter()
        .map(|s| proc.ssb(s).magnitude)
        .skip(50)
        .collect();
    assert!(quiet.iter().all(|&m| (110..=210).contains(&m)));
}

#[test]
fn test_ssb_silence() {
    let mut proc = SampleProcessor::default();
    for _ in 0..100 {
        assert_eq!(proc.ssb(0), Polar::default());
    }
}

// =============================================================================
// AM / FM
// =============================================================================

#[test]
fn test_am_pedestal_at_silence() {
    for shift in 0..=8 {
        assert_eq!(SampleProcessor::am(0, Drive::from_shift(shift)), AM_BASE as u8);
    }
}

#[test]
fn test_am_clamps_to_pwm_range() {
    assert_eq!(SampleProcessor::am(i16::MAX, Drive::from_shift(4)), 255);
    assert_eq!(SampleProcessor::am(i16::MIN, Drive::from_shift(4)), 0);
    assert_eq!(SampleProcessor::am(-32, Drive::from_shift(4)), 0);
    assert_eq!(SampleProcessor::am(223, Drive::from_shift(4)), 255);
}

#[test]
fn test_am_low_drive_attenuates() {
    // Drive 0: sample >> 4
    assert_eq!(SampleProcessor::am(160, Drive::MIN), 42);
    assert_eq!(SampleProcessor::am(-160, Drive::MIN), 22);
}

#[test]
fn test_fm_scales_by_drive() {
    assert_eq!(SampleProcessor::fm(10, Drive::MIN), 10);
    assert_eq!(SampleProcessor::fm(-10, Drive::from_shift(3)), -80);
}

#[test]
fn test_fm_stays_within_tuning_span() {
    for s in [i16::MIN, -5000, -1, 0, 1, 5000, i16::MAX] {
        let df = SampleProcessor::fm(s, Drive::from_shift(4));
        assert!(df.abs() <= FAST_TUNING_SPAN_HZ);
    }
}

// =============================================================================
// Dispatch
// =============================================================================

#[test]
fn test_encode_dispatches_by_mode() {
    let mut proc = SampleProcessor::default();
    let drive = Drive::from_shift(4);
    let vol = SidetoneVolume::default();

    assert_eq!(proc.encode(Mode::Am, 64, drive, vol), Encoded::Envelope(96));
    assert_eq!(proc.encode(Mode::Fm, 64, drive, vol), Encoded::Deviation(1024));
    assert!(matches!(proc.encode(Mode::Usb, 0, drive, vol), Encoded::Voice(_)));
    assert!(matches!(proc.encode(Mode::Lsb, 0, drive, vol), Encoded::Voice(_)));
}

#[test]
fn test_cw_ignores_sample_and_runs_side_tone() {
    let mut proc = SampleProcessor::new(SidetonePitch::Hz700);
    let mut reference = ToneOscillator::new(SidetonePitch::Hz700);
    let vol = SidetoneVolume::MAX;
    for n in 0..50 {
        let sample = if n % 2 == 0 { i16::MAX } else { i16::MIN };
        let expected = reference.next_level(vol);
        assert_eq!(
            proc.encode(Mode::Cw, sample, Drive::default(), vol),
            Encoded::Keyed { sidetone: expected }
        );
    }
}

#[test]
fn test_reset_keeps_side_tone_running() {
    let mut proc = SampleProcessor::default();
    for _ in 0..5 {
        proc.cw(SidetoneVolume::default());
    }
    let before = *proc.tone();
    proc.reset();
    assert_eq!(*proc.tone(), before);
}
