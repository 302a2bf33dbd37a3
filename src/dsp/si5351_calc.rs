//! Si5351 Frequency Calculation
//!
//! Fractional-N PLL and multisynth register calculations for the transmit
//! carrier, including the fast-tuning plan used once per sample. This
//! module is pure and testable on the host.
//!
//! # Theory of Operation
//!
//! The Si5351 uses a two-stage frequency synthesis:
//! 1. PLL stage: FVCO = FXTAL × (a + b/c) where 15 ≤ a ≤ 90
//! 2. Multisynth stage: FOUT = FVCO / (d + e/f) where 4 ≤ d ≤ 1800
//!
//! For fast tuning the multisynth stays a fixed even integer and only the
//! PLL numerator moves. The plan picks the divider so the PLL integer part
//! is the same across the whole tuning span; a frequency step then costs a
//! single 8-byte write of the PLL block.

/// PLL parameters for frequency calculation
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PllParams {
    /// Integer part (15-90)
    pub a: u32,
    /// Numerator (0 to c-1)
    pub b: u32,
    /// Denominator (1-1048575)
    pub c: u32,
}

impl PllParams {
    /// Minimum PLL multiplier
    pub const MIN_A: u32 = 15;
    /// Maximum PLL multiplier
    pub const MAX_A: u32 = 90;
    /// Maximum denominator (20 bits)
    pub const MAX_C: u32 = 1_048_575;

    /// Create integer PLL params (b=0, c=1)
    #[must_use]
    pub const fn integer(a: u32) -> Self {
        Self { a, b: 0, c: 1 }
    }

    /// Create fractional PLL params
    #[must_use]
    pub const fn fractional(a: u32, b: u32, c: u32) -> Self {
        Self { a, b, c }
    }

    /// Calculate the VCO frequency given crystal frequency
    #[must_use]
    pub fn vco_frequency(&self, xtal_hz: u64) -> u64 {
        // FVCO = FXTAL × (a + b/c)
        // To avoid floating point: FVCO = (FXTAL × a × c + FXTAL × b) / c
        (xtal_hz * u64::from(self.a) * u64::from(self.c) + xtal_hz * u64::from(self.b)) / u64::from(self.c)
    }

    /// Validate parameters are in range
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        self.a >= Self::MIN_A
            && self.a <= Self::MAX_A
            && self.c >= 1
            && self.c <= Self::MAX_C
            && self.b < self.c
    }

    /// Calculate P1, P2, P3 register values for Si5351
    #[must_use]
    pub const fn to_registers(&self) -> (u32, u32, u32) {
        // From Si5351 datasheet:
        // P1 = 128 × a + floor(128 × b/c) - 512
        // P2 = 128 × b - c × floor(128 × b/c)
        // P3 = c
        let floor_128b_c = (128 * self.b) / self.c;
        let p1 = 128 * self.a + floor_128b_c - 512;
        let p2 = 128 * self.b - self.c * floor_128b_c;
        let p3 = self.c;
        (p1, p2, p3)
    }
}

/// Multisynth divider parameters
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MsParams {
    /// Integer part (4, 6-1800)
    pub a: u32,
    /// Numerator
    pub b: u32,
    /// Denominator
    pub c: u32,
    /// R divider power of 2 (0-7 for 1, 2, 4, 8, 16, 32, 64, 128)
    pub r_div: u8,
}

impl MsParams {
    /// Minimum integer divisor
    pub const MIN_A: u32 = 4;
    /// Maximum integer divisor
    pub const MAX_A: u32 = 1800;
    /// Maximum denominator (20 bits)
    pub const MAX_C: u32 = 1_048_575;

    /// Create integer multisynth params (b=0, c=1)
    #[must_use]
    pub const fn integer(a: u32) -> Self {
        Self {
            a,
            b: 0,
            c: 1,
            r_div: 0,
        }
    }

    /// Calculate output frequency given VCO frequency
    #[must_use]
    pub fn output_frequency(&self, vco_hz: u64) -> u64 {
        // FOUT = FVCO / (a + b/c) / R
        // To avoid floating point: FOUT = FVCO × c / (a × c + b) / R
        let divisor = u64::from(self.a) * u64::from(self.c) + u64::from(self.b);
        let r = 1u64 << self.r_div;
        (vco_hz * u64::from(self.c)) / divisor / r
    }

    /// Validate parameters are in range
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        // Note: a=5 is not allowed
        let a_valid = self.a == 4 || (self.a >= 6 && self.a <= Self::MAX_A);
        let c_valid = self.c >= 1 && self.c <= Self::MAX_C;
        let b_valid = self.b < self.c;
        let r_valid = self.r_div <= 7;
        a_valid && c_valid && b_valid && r_valid
    }

    /// Check if this is an even integer divisor (integer mode, lowest jitter)
    #[must_use]
    pub const fn is_even_integer(&self) -> bool {
        self.b == 0 && self.a % 2 == 0 && self.r_div == 0
    }

    /// Calculate P1, P2, P3 register values
    #[must_use]
    pub const fn to_registers(&self) -> (u32, u32, u32) {
        let floor_128b_c = (128 * self.b) / self.c;
        let p1 = 128 * self.a + floor_128b_c - 512;
        let p2 = 128 * self.b - self.c * floor_128b_c;
        let p3 = self.c;
        (p1, p2, p3)
    }
}

/// Minimum VCO frequency (600 MHz)
pub const VCO_MIN_HZ: u64 = 600_000_000;
/// Maximum VCO frequency (900 MHz)
pub const VCO_MAX_HZ: u64 = 900_000_000;

/// Fixed PLL denominator used for fast tuning
pub const FAST_DENOM: u32 = 0x8_0000;

/// Size of one PLL or multisynth parameter block
pub const BLOCK_LEN: usize = 8;

/// Pack P1/P2/P3 into the 8-byte register block layout shared by the PLL
/// and multisynth parameter banks
#[must_use]
pub const fn pack_block(p1: u32, p2: u32, p3: u32, r_div: u8) -> [u8; BLOCK_LEN] {
    [
        ((p3 >> 8) & 0xFF) as u8,
        (p3 & 0xFF) as u8,
        ((r_div & 0x07) << 4) | ((p1 >> 16) & 0x03) as u8,
        ((p1 >> 8) & 0xFF) as u8,
        (p1 & 0xFF) as u8,
        (((p3 >> 12) & 0xF0) | ((p2 >> 16) & 0x0F)) as u8,
        ((p2 >> 8) & 0xFF) as u8,
        (p2 & 0xFF) as u8,
    ]
}

/// One PLL parameter block, ready for a bulk write
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SynthRegisters([u8; BLOCK_LEN]);

impl SynthRegisters {
    /// Block for a set of PLL parameters
    #[must_use]
    pub const fn from_pll(pll: &PllParams) -> Self {
        let (p1, p2, p3) = pll.to_registers();
        Self(pack_block(p1, p2, p3, 0))
    }

    /// Block for a set of multisynth parameters
    #[must_use]
    pub const fn from_ms(ms: &MsParams) -> Self {
        let (p1, p2, p3) = ms.to_registers();
        Self(pack_block(p1, p2, p3, ms.r_div))
    }

    /// Raw register bytes
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; BLOCK_LEN] {
        &self.0
    }
}

/// Fast-tuning plan for a carrier frequency
///
/// Holds an even integer multisynth divider and the PLL setting for the
/// carrier itself. Offsets within the planned span only move the PLL
/// numerator.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FastTuning {
    xtal_hz: u32,
    carrier_hz: u32,
    divider: MsParams,
    pll: PllParams,
}

impl FastTuning {
    /// Plan fast tuning for `carrier_hz` covering `±span_hz`
    ///
    /// Tries even dividers from the top of the VCO range down and takes the
    /// first whose whole span keeps the VCO in range under one PLL integer
    /// part. Returns `None` when no divider qualifies.
    #[must_use]
    pub fn plan(xtal_hz: u32, carrier_hz: u32, span_hz: u32) -> Option<Self> {
        if xtal_hz == 0 || carrier_hz <= span_hz {
            return None;
        }
        let xtal = u64::from(xtal_hz);
        let f = u64::from(carrier_hz);
        let span = u64::from(span_hz);

        let mut d = (VCO_MAX_HZ / f).min(u64::from(MsParams::MAX_A)) & !1;
        while d >= u64::from(MsParams::MIN_A) {
            let vco = f * d;
            if vco < VCO_MIN_HZ {
                break;
            }
            let lo = (f - span) * d;
            let hi = (f + span) * d;
            let a = vco / xtal;
            let fits = lo >= VCO_MIN_HZ
                && hi <= VCO_MAX_HZ
                && lo / xtal == a
                && hi / xtal == a
                && (u64::from(PllParams::MIN_A)..=u64::from(PllParams::MAX_A)).contains(&a);
            if fits {
                let b = (vco - a * xtal) * u64::from(FAST_DENOM) / xtal;
                return Some(Self {
                    xtal_hz,
                    carrier_hz,
                    divider: MsParams::integer(d as u32),
                    pll: PllParams::fractional(a as u32, b as u32, FAST_DENOM),
                });
            }
            d -= 2;
        }
        None
    }

    /// Planned carrier in Hz
    #[must_use]
    pub const fn carrier_hz(&self) -> u32 {
        self.carrier_hz
    }

    /// Multisynth divider for the carrier output
    #[must_use]
    pub const fn divider(&self) -> MsParams {
        self.divider
    }

    /// PLL setting at zero offset
    #[must_use]
    pub const fn base_pll(&self) -> PllParams {
        self.pll
    }

    /// PLL setting for a carrier offset of `df` Hz
    ///
    /// `df` must stay within the planned span to keep the PLL in range.
    #[must_use]
    pub fn pll_for(&self, df: i32) -> PllParams {
        let denom = i64::from(FAST_DENOM);
        let base = i64::from(self.pll.a) * denom + i64::from(self.pll.b);
        let shift = i64::from(self.divider.a) * i64::from(df) * denom / i64::from(self.xtal_hz);
        let n = (base + shift).max(0);
        PllParams::fractional((n / denom) as u32, (n % denom) as u32, FAST_DENOM)
    }

    /// PLL register block for a carrier offset of `df` Hz
    #[must_use]
    pub fn registers(&self, df: i32) -> SynthRegisters {
        SynthRegisters::from_pll(&self.pll_for(df))
    }

    /// Output frequency produced by an offset, in Hz
    #[must_use]
    pub fn output_frequency(&self, df: i32) -> u64 {
        let vco = self.pll_for(df).vco_frequency(u64::from(self.xtal_hz));
        self.divider.output_frequency(vco)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pll_params_integer() {
        let pll = PllParams::integer(36);
        assert_eq!(pll.a, 36);
        assert_eq!(pll.b, 0);
        assert_eq!(pll.c, 1);
        assert!(pll.is_valid());

        // 25 MHz × 36 = 900 MHz
        let vco = pll.vco_frequency(25_000_000);
        assert_eq!(vco, 900_000_000);
    }

    #[test]
    fn pll_params_fractional() {
        let pll = PllParams::fractional(35, 1, 2);
        assert!(pll.is_valid());

        // 25 MHz × 35.5 = 887.5 MHz
        let vco = pll.vco_frequency(25_000_000);
        assert_eq!(vco, 887_500_000);
    }

    #[test]
    fn pll_params_validation() {
        assert!(!PllParams::integer(14).is_valid()); // Below min
        assert!(!PllParams::integer(91).is_valid()); // Above max
        assert!(PllParams::integer(15).is_valid());
        assert!(PllParams::integer(90).is_valid());
    }

    #[test]
    fn ms_params_validation() {
        assert!(!MsParams::integer(3).is_valid()); // Below min
        assert!(MsParams::integer(4).is_valid()); // Min allowed
        assert!(!MsParams::integer(5).is_valid());
        assert!(MsParams::integer(6).is_valid());
        assert!(!MsParams::integer(1801).is_valid()); // Above max
    }

    #[test]
    fn pll_register_values() {
        // For a=36, b=0, c=1:
        // P1 = 128×36 + 0 - 512 = 4096
        let (p1, p2, p3) = PllParams::integer(36).to_registers();
        assert_eq!((p1, p2, p3), (4096, 0, 1));
    }

    #[test]
    fn block_packing() {
        let regs = SynthRegisters::from_pll(&PllParams::integer(36));
        // P3 = 1, P1 = 0x1000, P2 = 0
        assert_eq!(regs.as_bytes(), &[0x00, 0x01, 0x00, 0x10, 0x00, 0x00, 0x00, 0x00]);
    }

    #[test]
    fn ms_block_carries_r_divider() {
        let ms = MsParams {
            r_div: 3,
            ..MsParams::integer(100)
        };
        assert_eq!(SynthRegisters::from_ms(&ms).as_bytes()[2] >> 4, 3);
    }

    #[test]
    fn plan_7100khz() {
        let plan = FastTuning::plan(25_000_000, 7_100_000, 10_000).unwrap();
        assert!(plan.divider().is_even_integer());
        assert!(plan.divider().is_valid());
        assert!(plan.base_pll().is_valid());
        let err = plan.output_frequency(0) as i64 - 7_100_000;
        assert!(err.abs() <= 1);
    }

    #[test]
    fn plan_keeps_integer_part_across_span() {
        let plan = FastTuning::plan(25_000_000, 14_200_000, 10_000).unwrap();
        let a = plan.base_pll().a;
        assert_eq!(plan.pll_for(-10_000).a, a);
        assert_eq!(plan.pll_for(10_000).a, a);
    }

    #[test]
    fn plan_rejects_out_of_range() {
        assert!(FastTuning::plan(25_000_000, 5_000, 10_000).is_none());
        assert!(FastTuning::plan(0, 7_000_000, 10_000).is_none());
    }
}
