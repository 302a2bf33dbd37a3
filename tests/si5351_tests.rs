//! Si5351 Driver Tests
//!
//! Register traffic against a fake register file, fast-tuning plans across
//! the HF bands, and the start-up bus self-test.
//! Run with: cargo test --test si5351_tests

mod common;

use common::FakeSynthBus;
use embedded_hal::i2c::ErrorKind;
use phase_ampl_tx::drivers::si5351::{
    reg, throughput_kbps, CrystalLoad, DriveStrength, Si5351, SynthError, OE_ALL_OFF,
    OE_CARRIER_ON,
};
use phase_ampl_tx::dsp::si5351_calc::{FastTuning, SynthRegisters, FAST_DENOM};
use phase_ampl_tx::types::Frequency;

fn freq(hz: u32) -> Frequency {
    Frequency::from_hz(hz).unwrap()
}

fn tuned(hz: u32) -> Si5351<FakeSynthBus> {
    let mut synth = Si5351::new(FakeSynthBus::new());
    synth.init(CrystalLoad::default()).unwrap();
    synth.set_carrier(freq(hz)).unwrap();
    synth.bus_mut().clear_log();
    synth
}

/// Clock returning `start` then `end` for the throughput run
fn two_reading_clock(start: u32, end: u32) -> impl FnMut() -> u32 {
    let mut readings = [start, end].into_iter();
    move || readings.next().unwrap_or(end)
}

// =============================================================================
// Fast-tuning plans
// =============================================================================

#[test]
fn test_plan_7100khz_reference_values() {
    let plan = FastTuning::plan(25_000_000, 7_100_000, 10_000).unwrap();
    assert_eq!(plan.divider().a, 126);
    assert_eq!(plan.base_pll().a, 35);
    assert_eq!(plan.base_pll().b, 411_041);
    assert_eq!(plan.base_pll().c, FAST_DENOM);
    assert_eq!(plan.output_frequency(0), 7_099_999);
}

#[test]
fn test_plan_across_hf_bands() {
    for hz in [
        1_810_000, 3_573_000, 7_074_000, 10_136_000, 14_074_000, 18_100_000, 21_074_000,
        24_915_000, 28_074_000,
    ] {
        let plan = FastTuning::plan(25_000_000, hz, 10_000)
            .unwrap_or_else(|| panic!("no plan for {hz}"));
        let d = plan.divider();
        assert!(d.is_even_integer() && d.is_valid(), "{hz}: divider {d:?}");

        let vco = plan.base_pll().vco_frequency(25_000_000);
        assert!((600_000_000..=900_000_000).contains(&vco), "{hz}: vco {vco}");

        let a = plan.base_pll().a;
        for df in [-10_000, -1_000, -1, 0, 1, 1_000, 10_000] {
            let pll = plan.pll_for(df);
            assert_eq!(pll.a, a, "{hz} {df:+}: integer part moved");
            assert!(pll.is_valid());
            let err = plan.output_frequency(df) as i64 - (i64::from(hz) + i64::from(df));
            assert!(err.abs() <= 4, "{hz} {df:+}: off by {err} Hz");
        }
    }
}

#[test]
fn test_offsets_are_monotonic() {
    let plan = FastTuning::plan(25_000_000, 14_200_000, 10_000).unwrap();
    let mut prev = plan.output_frequency(-10_000);
    for df in (-9_900..=10_000).step_by(100) {
        let f = plan.output_frequency(df);
        assert!(f > prev, "df {df}");
        prev = f;
    }
}

#[test]
fn test_plan_needs_room_for_span() {
    assert!(FastTuning::plan(25_000_000, 10_000, 10_000).is_none());
    assert!(FastTuning::plan(25_000_000, 7_100_000, 0).is_some());
}

// =============================================================================
// Driver register traffic
// =============================================================================

#[test]
fn test_init_turns_everything_off() {
    let mut synth = Si5351::new(FakeSynthBus::new());
    synth.init(CrystalLoad::Load8pF).unwrap();

    let bus = synth.bus();
    assert_eq!(bus.regs[usize::from(reg::OUTPUT_ENABLE)], OE_ALL_OFF);
    assert_eq!(bus.regs[usize::from(reg::CLK0_CONTROL)], 0x80);
    assert_eq!(bus.regs[usize::from(reg::CLK1_CONTROL)], 0x80);
    assert_eq!(bus.regs[usize::from(reg::CLK2_CONTROL)], 0x80);
    assert_eq!(bus.regs[usize::from(reg::CRYSTAL_LOAD)], 0b1000_0000);
    assert!(!synth.is_output_enabled());
    assert!(synth.tuning().is_none());
}

#[test]
fn test_init_gives_up_waiting_for_sys_init() {
    let mut bus = FakeSynthBus::new();
    bus.regs[usize::from(reg::DEVICE_STATUS)] = 0x80;
    let mut synth = Si5351::new(bus);
    assert!(synth.init(CrystalLoad::default()).is_ok());
    assert!(synth.bus().transactions >= 1_000);
}

#[test]
fn test_init_propagates_bus_error() {
    let mut bus = FakeSynthBus::new();
    bus.fail_next = 1;
    let mut synth = Si5351::new(bus);
    assert_eq!(
        synth.init(CrystalLoad::default()),
        Err(SynthError::Bus(ErrorKind::ArbitrationLoss))
    );
}

#[test]
fn test_set_carrier_programs_ms2_and_plla() {
    let mut synth = Si5351::new(FakeSynthBus::new());
    synth.set_carrier(freq(7_100_000)).unwrap();

    let plan = *synth.tuning().unwrap();
    assert_eq!(plan.carrier_hz(), 7_100_000);

    let bus = synth.bus();
    let ms2 = bus.writes_to(reg::MS2_PARAMS).next().unwrap();
    // P1 = 128 * 126 - 512 = 0x3D00, P3 = 1
    assert_eq!(ms2.data, vec![0x00, 0x01, 0x00, 0x3D, 0x00, 0x00, 0x00, 0x00]);

    assert_eq!(bus.regs[usize::from(reg::CLK2_CONTROL)], 0x4F);
    assert_eq!(
        &bus.regs[26..34],
        plan.registers(0).as_bytes().as_slice()
    );
    assert_eq!(bus.regs[usize::from(reg::PLL_RESET)], 0x20);

    // PLL reset comes after the PLL block
    let order: Vec<u8> = bus.writes.iter().map(|w| w.reg).collect();
    assert_eq!(order, vec![reg::MS2_PARAMS, reg::CLK2_CONTROL, reg::PLLA_PARAMS, reg::PLL_RESET]);
}

#[test]
fn test_drive_strength_reaches_clk2_control() {
    let mut synth = Si5351::new(FakeSynthBus::new());
    synth.set_drive_strength(DriveStrength::Drive2mA);
    synth.set_carrier(freq(14_200_000)).unwrap();
    assert_eq!(synth.bus().regs[usize::from(reg::CLK2_CONTROL)], 0x4C);
}

#[test]
fn test_retune_replaces_plan() {
    let mut synth = tuned(7_100_000);
    synth.set_carrier(freq(14_200_000)).unwrap();
    assert_eq!(synth.tuning().map(FastTuning::carrier_hz), Some(14_200_000));
    assert_eq!(synth.tuning().unwrap().divider().a, 62);
}

#[test]
fn test_compute_registers_needs_carrier() {
    let synth = Si5351::new(FakeSynthBus::new());
    assert!(synth.compute_registers(100).is_none());

    let synth = tuned(7_100_000);
    let plan = synth.tuning().unwrap();
    assert_eq!(synth.compute_registers(100), Some(plan.registers(100)));
    // Pure: nothing went out on the bus
    assert!(synth.bus().writes.is_empty());
}

#[test]
fn test_write_bulk_is_one_transaction() {
    let mut synth = tuned(7_100_000);
    let regs = synth.compute_registers(-500).unwrap();
    let before = synth.bus().transactions;
    synth.write_bulk(&regs).unwrap();

    let bus = synth.bus();
    assert_eq!(bus.transactions, before + 1);
    assert_eq!(bus.bulk_writes().len(), 1);
    assert_eq!(bus.bulk_writes()[0].data, regs.as_bytes().to_vec());
}

#[test]
fn test_output_enable_values() {
    let mut synth = tuned(7_100_000);
    synth.set_output_enabled(true).unwrap();
    assert!(synth.is_output_enabled());
    synth.set_output_enabled(false).unwrap();
    assert!(!synth.is_output_enabled());
    assert_eq!(synth.bus().output_enable_writes(), vec![OE_CARRIER_ON, OE_ALL_OFF]);
}

#[test]
fn test_failed_enable_write_keeps_state() {
    let mut synth = tuned(7_100_000);
    synth.bus_mut().fail_reg = Some(reg::OUTPUT_ENABLE);
    assert!(synth.set_output_enabled(true).is_err());
    assert!(!synth.is_output_enabled());
}

#[test]
fn test_power_down_disables_outputs() {
    let mut synth = tuned(7_100_000);
    synth.set_output_enabled(true).unwrap();
    synth.power_down().unwrap();
    assert!(!synth.is_output_enabled());
    assert_eq!(synth.bus().regs[usize::from(reg::CLK2_CONTROL)], 0x80);
}

#[test]
fn test_release_returns_bus() {
    let synth = tuned(7_100_000);
    let bus = synth.release();
    assert_eq!(bus.regs[usize::from(reg::PLL_RESET)], 0x20);
}

#[test]
fn test_synth_error_display() {
    let e: SynthError<ErrorKind> = SynthError::NoSolution;
    assert_eq!(e.to_string(), "no synthesizer plan for carrier");
    let e: SynthError<ErrorKind> = SynthError::Bus(ErrorKind::Other);
    assert!(e.to_string().starts_with("synthesizer bus error"));
}

// =============================================================================
// Self-test
// =============================================================================

#[test]
fn test_self_test_requires_carrier() {
    let mut synth = Si5351::new(FakeSynthBus::new());
    assert_eq!(synth.self_test(|| 0), Err(SynthError::NoSolution));
}

#[test]
fn test_self_test_clean_bus() {
    let mut synth = tuned(7_100_000);
    let report = synth.self_test(two_reading_clock(1_000, 81_000)).unwrap();

    assert!(report.is_clean());
    assert_eq!(report.transfers, 10_000);
    assert_eq!(report.elapsed_us, 80_000);
    assert_eq!(report.throughput_kbps, 700);

    // 10000 checked writes, 1000 timed writes, one restore
    assert_eq!(synth.bus().bulk_writes().len(), 11_001);
}

#[test]
fn test_self_test_restores_carrier_block() {
    let mut synth = tuned(7_100_000);
    synth.self_test(|| 0).unwrap();
    let expected: SynthRegisters = synth.tuning().unwrap().registers(0);
    let bus = synth.bus();
    assert_eq!(bus.bulk_writes().last().unwrap().data, expected.as_bytes().to_vec());
}

#[test]
fn test_self_test_counts_corrupted_readback() {
    let mut synth = tuned(7_100_000);
    synth.bus_mut().read_corruption = 0x01;
    let report = synth.self_test(|| 0).unwrap();
    // Every compared byte differs: 4 per transfer
    assert_eq!(report.bit_errors, 40_000);
    assert!(!report.is_clean());
}

#[test]
fn test_self_test_counts_failed_writes() {
    let mut synth = tuned(7_100_000);
    synth.bus_mut().fail_reg = Some(reg::PLLA_PARAMS);
    let report = synth.self_test(|| 0).unwrap();
    assert_eq!(report.bit_errors, 40_000);
}

#[test]
fn test_self_test_survives_transient_faults() {
    let mut synth = tuned(7_100_000);
    synth.bus_mut().fail_next = 3;
    let report = synth.self_test(|| 0).unwrap();
    assert!(report.bit_errors > 0 && report.bit_errors <= 12);
}

#[test]
fn test_self_test_zero_elapsed_reports_zero_throughput() {
    let mut synth = tuned(7_100_000);
    let report = synth.self_test(|| 5).unwrap();
    assert_eq!(report.elapsed_us, 0);
    assert_eq!(report.throughput_kbps, 0);
}

#[test]
fn test_self_test_clock_wraparound() {
    let mut synth = tuned(7_100_000);
    let report = synth
        .self_test(two_reading_clock(u32::MAX - 9_999, 70_000))
        .unwrap();
    assert_eq!(report.elapsed_us, 80_000);
}

#[test]
fn test_throughput_kbps() {
    assert_eq!(throughput_kbps(1_000, 80_000), 700);
    assert_eq!(throughput_kbps(1_000, 56_000), 1_000);
    assert_eq!(throughput_kbps(0, 1_000), 0);
    assert_eq!(throughput_kbps(1_000, 0), 0);
}
