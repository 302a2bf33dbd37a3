//! Phase/Amplitude Transmitter Main Application
//!
//! Entry point for the STM32G474-based transmitter firmware.
//! Initializes hardware, runs the bus self-test and spawns the sample-clock
//! task on a high-priority interrupt executor; PTT handling stays on the
//! thread executor.

#![no_std]
#![no_main]

use defmt::{info, warn};
use embassy_executor::{InterruptExecutor, Spawner};
use embassy_stm32::gpio::{Input, OutputType, Pull};
use embassy_stm32::i2c::I2c;
use embassy_stm32::interrupt;
use embassy_stm32::interrupt::{InterruptExt, Priority};
use embassy_stm32::mode::Blocking;
use embassy_stm32::peripherals::{PA1, TIM1};
use embassy_stm32::time::Hertz;
use embassy_stm32::timer::low_level::CountingMode;
use embassy_stm32::timer::simple_pwm::{PwmPin, SimplePwm, SimplePwmChannel};
use embassy_time::{Duration, Ticker, Timer};
use {defmt_rtt as _, panic_probe as _};

use phase_ampl_tx::drivers::si5351::{CrystalLoad, Si5351};
use phase_ampl_tx::dsp::amplitude::AmplitudeLut;
use phase_ampl_tx::hal::adc::MicInput;
use phase_ampl_tx::hal::timer::{micros, SampleClock, TickBudget};
use phase_ampl_tx::prelude::*;
use phase_ampl_tx::radio::handoff::{ControlLink, ModulatorConfig};
use phase_ampl_tx::radio::transmit::Transmitter;

type TxChain = Transmitter<
    I2c<'static, Blocking>,
    SimplePwmChannel<'static, TIM1>,
    SimplePwmChannel<'static, TIM1>,
    MicInput<'static, PA1>,
>;

/// Control loop to sample interrupt handoff
static LINK: ControlLink = ControlLink::new(ModulatorConfig::new());

/// Executor for the sample clock, preempting the thread executor
static EXECUTOR_SAMPLE: InterruptExecutor = InterruptExecutor::new();

#[interrupt]
unsafe fn UART4() {
    EXECUTOR_SAMPLE.on_interrupt();
}

/// Main entry point
#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("Phase/Amplitude TX Firmware v{}", env!("CARGO_PKG_VERSION"));

    // Initialize STM32G474 peripherals with default clock configuration
    let config = embassy_stm32::Config::default();
    let p = embassy_stm32::init(config);

    info!("Peripherals initialized");

    // I2C1 for the Si5351A: PB8 = SCL, PB9 = SDA
    let i2c = I2c::new_blocking(
        p.I2C1,
        p.PB8,
        p.PB9,
        Hertz(I2C_FREQUENCY_HZ),
        Default::default(),
    );

    let mut synth = Si5351::new(i2c);
    if let Err(e) = synth.init(CrystalLoad::default()) {
        warn!("Si5351 init failed: {}", e);
    }
    match default_frequency() {
        Some(freq) => {
            if let Err(e) = synth.set_carrier(freq) {
                warn!("Carrier setup failed: {}", e);
            }
        }
        None => warn!("Default frequency out of range"),
    }
    match synth.self_test(micros) {
        Ok(report) if !report.is_clean() => warn!("I2C bus unreliable: {}", report),
        Ok(_) => {}
        Err(e) => warn!("I2C self-test skipped: {}", e),
    }

    // TIM1: CH1 (PA8) drives the PA supply, CH2 (PA9) the side tone
    let pwm = SimplePwm::new(
        p.TIM1,
        Some(PwmPin::new_ch1(p.PA8, OutputType::PushPull)),
        Some(PwmPin::new_ch2(p.PA9, OutputType::PushPull)),
        None,
        None,
        Hertz(PWM_FREQUENCY_HZ),
        CountingMode::EdgeAlignedUp,
    );
    let channels = pwm.split();
    let mut amplitude = channels.ch1;
    let mut sidetone = channels.ch2;
    amplitude.set_duty_cycle_fully_off();
    sidetone.set_duty_cycle_fully_off();
    amplitude.enable();
    sidetone.enable();

    let mic = MicInput::new(p.ADC1, p.PA1);

    let tx = Transmitter::new(synth, amplitude, sidetone, mic, AmplitudeLut::default());

    if let Some(tuning) = tx.synth().tuning() {
        info!("Transmit chain ready at {}Hz", tuning.carrier_hz());
    }

    // Sample clock preempts everything on the thread executor
    interrupt::UART4.set_priority(Priority::P6);
    let sample_spawner = EXECUTOR_SAMPLE.start(interrupt::UART4);
    if sample_spawner.spawn(sample_clock_task(tx)).is_err() {
        warn!("Sample clock task failed to spawn");
    }

    let ptt = Input::new(p.PA3, Pull::Up);
    if spawner.spawn(ptt_task(ptt)).is_err() {
        warn!("PTT task failed to spawn");
    }

    info!("Tasks spawned, entering main loop");

    loop {
        Timer::after(Duration::from_secs(10)).await;
        info!("{}", LINK.config.snapshot());
    }
}

/// Sample clock task - one transmit tick per sample period
#[embassy_executor::task]
async fn sample_clock_task(mut tx: TxChain) {
    let mut clock = SampleClock::from_rate(TX_SAMPLE_RATE);
    let mut budget = TickBudget::for_clock(&clock);
    let mut ticks = 0u32;
    info!("{}", clock);

    loop {
        clock.tick().await;
        budget.begin();
        tx.tick(&LINK);
        budget.end();

        ticks = ticks.wrapping_add(1);
        if ticks % TX_SAMPLE_RATE == 0 {
            let window = budget.report();
            if window.overruns() > 0 {
                warn!("Tick overran: {}", window);
            }
            if tx.is_faulted() {
                warn!("Carrier fault: {}", tx.diagnostics());
            }
        }
    }
}

/// PTT task - debounced active-low key input
#[embassy_executor::task]
async fn ptt_task(ptt: Input<'static>) {
    let mut ticker = Ticker::every(Duration::from_millis(PTT_DEBOUNCE_MS));
    let mut last = false;
    let mut stable = false;

    loop {
        ticker.next().await;
        let pressed = ptt.is_low();
        if pressed == last && pressed != stable {
            stable = pressed;
            LINK.gate.set(stable);
            info!("PTT {}", if stable { "down" } else { "up" });
        }
        last = pressed;
    }
}
