//! Register offsets, status bits and value encodings of the charger blocks.
//!
//! Offsets are relative to the owning block's base address in
//! [`PeripheralBases`](crate::PeripheralBases). Encoders take the semantic
//! value and return the raw field, or `None` when the value is outside the
//! programmable range.

// ── Offsets shared by every block ────────────────────────────────────────────

/// Block status register.
pub const STATUS: u16 = 0x09;
/// Real-time interrupt status (level of every interrupt source).
pub const INT_RT_STS: u16 = 0x10;
/// Secure-access unlock; write [`SEC_UNLOCK`] before a protected register.
pub const SEC_ACCESS: u16 = 0xD0;
/// Unlock key for [`SEC_ACCESS`].
pub const SEC_UNLOCK: u8 = 0xA5;

// ── Charger core ─────────────────────────────────────────────────────────────

/// Battery current sign as seen by the gauge.
pub const CHGR_IBAT_STS: u16 = 0x0D;
/// Max battery voltage.
pub const CHGR_VDD_MAX: u16 = 0x40;
/// Safe battery voltage.
pub const CHGR_VDD_SAFE: u16 = 0x41;
/// Max battery current.
pub const CHGR_IBAT_MAX: u16 = 0x44;
/// Safe battery current.
pub const CHGR_IBAT_SAFE: u16 = 0x45;
/// Input voltage floor.
pub const CHGR_VIN_MIN: u16 = 0x47;
/// Charge control: enable and force-run-on-battery.
pub const CHGR_CHG_CTRL: u16 = 0x49;
/// Safety-timer failure latch.
pub const CHGR_CHG_FAILED: u16 = 0x4A;
/// Termination current.
pub const CHGR_IBAT_TERM_CHGR: u16 = 0x5B;
/// Recharge detect voltage.
pub const CHGR_VBAT_DET: u16 = 0x5D;
/// Safety timer.
pub const CHGR_TCHG_MAX: u16 = 0x61;
/// Charger watchdog timeout.
pub const CHGR_CHG_WDOG_TIME: u16 = 0x62;

/// [`CHGR_CHG_CTRL`]: charging enabled.
pub const CHG_EN: u8 = 1 << 7;
/// [`CHGR_CHG_CTRL`]: run the system from the battery, ignoring the input.
pub const ON_BAT_FORCE: u8 = 1 << 0;
/// [`CHGR_CHG_FAILED`]: write 1 to clear the safety-timer failure.
pub const CHG_FAILED_CLEAR: u8 = 1 << 7;
/// [`CHGR_IBAT_STS`]: battery is discharging.
pub const IBAT_SIGN: u8 = 1 << 7;
/// [`CHGR_CHG_WDOG_TIME`] value that disables the watchdog.
pub const WDOG_DISABLED: u8 = 0xA0;
/// [`CHGR_IBAT_TERM_CHGR`] value selecting analog end-of-charge.
pub const ANALOG_EOC: u8 = 0x08;

// Charger core real-time status bits.
/// Charge done.
pub const CHG_DONE_RT: u8 = 1 << 7;
/// Charge failed.
pub const CHG_FAILED_RT: u8 = 1 << 6;
/// Fast charge on.
pub const FAST_CHG_ON_RT: u8 = 1 << 5;
/// Trickle charge on.
pub const TRKL_CHG_ON_RT: u8 = 1 << 4;
/// Battery voltage below the recharge threshold.
pub const VBAT_DET_LOW_RT: u8 = 1 << 0;

// ── Buck ─────────────────────────────────────────────────────────────────────

/// Regulation node selection.
pub const BUCK_VBAT_REG_MODE: u16 = 0x74;
/// Test modes (duty cycle limit).
pub const BUCK_TEST_SMBC_MODES: u16 = 0xE6;
/// Comparator override 1 (charge-done logic).
pub const BUCK_COMP_OVR1: u16 = 0xEB;
/// Comparator override 3 (VCP workaround).
pub const BUCK_COMP_OVR3: u16 = 0xED;

/// [`BUCK_VBAT_REG_MODE`]: regulate at the VBAT sense node.
pub const VBAT_REG_NODE_SEL: u8 = 1 << 0;
/// [`BUCK_TEST_SMBC_MODES`] field holding the duty-cycle limit.
pub const DUTY_MASK: u8 = 0x30;
/// [`DUTY_MASK`] value: 100 % duty allowed.
pub const DUTY_100P: u8 = 0x00;
/// [`DUTY_MASK`] value: duty limited.
pub const DUTY_LIMITED: u8 = 0x10;
/// [`BUCK_COMP_OVR1`] field for the charge-done comparator.
pub const CHG_DONE_OVR_MASK: u8 = 0xC0;
/// [`CHG_DONE_OVR_MASK`] value forcing the comparator off.
pub const CHG_DONE_OVR_OFF: u8 = 0x80;
/// [`BUCK_COMP_OVR3`] field driven by the VCP workaround.
pub const VCP_OVR_MASK: u8 = 0x0C;

/// Buck real-time status: constant-voltage loop in regulation.
pub const VDD_LOOP_RT: u8 = 1 << 6;

// ── Battery interface ────────────────────────────────────────────────────────

/// Battery-presence detection control.
pub const BAT_IF_BPD_CTRL: u16 = 0x48;
/// Thermistor reference control.
pub const BAT_IF_VREF_BAT_THM_CTRL: u16 = 0x4A;

/// [`BAT_IF_BPD_CTRL`] selection field.
pub const BPD_SEL_MASK: u8 = 0x03;
/// Presence through the thermistor line.
pub const BAT_THM_EN: u8 = 1 << 1;
/// Presence through the ID line.
pub const BAT_ID_EN: u8 = 1 << 0;
/// [`BAT_IF_VREF_BAT_THM_CTRL`]: force the reference on.
pub const VREF_BAT_THM_FORCE_ON: u8 = 0xC0;

/// Battery status ([`STATUS`]): temperature OK.
pub const BATT_TEMP_OK: u8 = 1 << 7;
/// Battery status ([`STATUS`]): temperature hot.
pub const BATT_TEMP_HOT: u8 = 1 << 6;

// Battery interface real-time status bits.
/// Battery FET closed.
pub const BAT_FET_ON_RT: u8 = 1 << 2;
/// Battery temperature within limits.
pub const BAT_TEMP_OK_RT: u8 = 1 << 1;
/// Battery present.
pub const BATT_PRES_RT: u8 = 1 << 0;

// ── Input paths ──────────────────────────────────────────────────────────────

/// USB OVP control (valid debounce).
pub const USB_OVP_CTL: u16 = 0x42;
/// Input current limit (USB and DC paths).
pub const PATH_I_MAX: u16 = 0x44;
/// USB suspend.
pub const USB_SUSP: u16 = 0x47;
/// USB OTG control.
pub const USB_OTG_CTL: u16 = 0x48;
/// USB enumeration timer.
pub const USB_ENUM_T_STOP: u16 = 0x4E;
/// Reverse-boost detection on charger-gone.
pub const USB_CHG_GONE_REV_BST: u16 = 0xED;

/// [`USB_OVP_CTL`]: 20 ms valid debounce.
pub const USB_VALID_DEB_20MS: u8 = 0x03;
/// [`USB_SUSP`]: input suspended.
pub const USB_SUSPEND: u8 = 1 << 0;
/// [`USB_OTG_CTL`]: host mode.
pub const USB_OTG_EN: u8 = 1 << 0;
/// [`USB_ENUM_T_STOP`]: stop the enumeration timer.
pub const ENUM_T_STOP: u8 = 1 << 0;
/// [`USB_CHG_GONE_REV_BST`] value enabling detection.
pub const REV_BST_DETECT_EN: u8 = 0x80;
/// USB status ([`STATUS`]): input valid.
pub const USB_VALID: u8 = 1 << 7;

// USB path real-time status bits.
/// Charger gone while charging.
pub const CHG_GONE_RT: u8 = 1 << 2;
/// USB input valid.
pub const USBIN_VALID_RT: u8 = 1 << 1;
/// Coarse USB detect.
pub const COARSE_DET_USB_RT: u8 = 1 << 0;

/// DC path real-time status: input valid.
pub const DCIN_VALID_RT: u8 = 1 << 1;

// ── Misc ─────────────────────────────────────────────────────────────────────

/// Buck clock source control.
pub const MISC_CLK_CTRL: u16 = 0xE2;
/// [`MISC_CLK_CTRL`]: software-controlled 19.2 MHz clock.
pub const CLK_SW_CONTROLLED: u8 = 0x07;
/// [`MISC_CLK_CTRL`]: hardware-controlled clock.
pub const CLK_HW_CONTROLLED: u8 = 0x00;

// ── Encodings ────────────────────────────────────────────────────────────────

/// Lowest input current step.
pub const I_MAX_MIN_MA: u32 = 100;
/// Second input current step.
pub const I_MAX_150_MA: u32 = 150;
/// Third input current step; linear 100 mA steps start here.
pub const I_MAX_200_MA: u32 = 200;
/// Highest programmable input current.
pub const I_MAX_MAX_MA: u32 = 2500;
/// Linear input current step.
pub const I_MAX_STEP_MA: u32 = 100;

/// Voltage field origin for VDD_MAX / VDD_SAFE.
pub const V_MIN_MV: u32 = 3240;
/// VDD_MAX / VDD_SAFE step.
pub const V_STEP_MV: u32 = 10;
/// Highest encodable VDD value.
pub const V_MAX_MV: u32 = 4500;

/// Lowest recharge detect voltage.
pub const VBATDET_MIN_MV: u32 = 3240;
/// Highest recharge detect voltage.
pub const VBATDET_MAX_MV: u32 = 5780;

/// Input current limit field.
#[inline]
#[must_use]
#[allow(clippy::arithmetic_side_effects, clippy::cast_possible_truncation)]
pub const fn encode_input_current(ma: u32) -> Option<u8> {
    match ma {
        I_MAX_MIN_MA => Some(0x00),
        I_MAX_150_MA => Some(0x01),
        I_MAX_MIN_MA..=I_MAX_MAX_MA => Some((ma / I_MAX_STEP_MA) as u8),
        _ => None,
    }
}

/// VDD_MAX / VDD_SAFE field for an already-trimmed voltage.
#[inline]
#[must_use]
#[allow(clippy::arithmetic_side_effects, clippy::cast_possible_truncation)]
pub const fn encode_vdd(mv: u32) -> Option<u8> {
    if mv < V_MIN_MV || mv > V_MAX_MV + 50 {
        return None;
    }
    Some(((mv - V_MIN_MV) / V_STEP_MV) as u8)
}

/// VBAT_DET field.
#[inline]
#[must_use]
#[allow(clippy::arithmetic_side_effects, clippy::cast_possible_truncation)]
pub const fn encode_vbatdet(mv: u32) -> Option<u8> {
    if mv < VBATDET_MIN_MV || mv > VBATDET_MAX_MV {
        return None;
    }
    Some(((mv - VBATDET_MIN_MV) / 20) as u8)
}

/// VIN_MIN field (5 bits; the high range starts at 0x2B and wraps into
/// the mask exactly as the silicon expects).
#[inline]
#[must_use]
#[allow(clippy::arithmetic_side_effects, clippy::cast_possible_truncation)]
pub const fn encode_vinmin(mv: u32) -> Option<u8> {
    if mv < 3400 || mv > 9600 {
        return None;
    }
    let raw = if mv >= 5600 {
        0x2B + (mv - 3400) / 200
    } else {
        (mv - 3400) / 50
    };
    Some((raw as u8) & 0x1F)
}

/// IBAT_MAX field.
#[inline]
#[must_use]
#[allow(clippy::arithmetic_side_effects, clippy::cast_possible_truncation)]
pub const fn encode_ibatmax(ma: u32) -> Option<u8> {
    if ma < 50 || ma > 3250 {
        return None;
    }
    Some(((ma / 50) as u8) & 0x3F)
}

/// IBAT_SAFE field.
#[inline]
#[must_use]
#[allow(clippy::arithmetic_side_effects, clippy::cast_possible_truncation)]
pub const fn encode_ibatsafe(ma: u32) -> Option<u8> {
    if ma < 200 || ma > 3000 {
        return None;
    }
    Some(((ma / 50) as u8) & 0x3F)
}

/// Termination current field.
#[inline]
#[must_use]
#[allow(clippy::arithmetic_side_effects, clippy::cast_possible_truncation)]
pub const fn encode_iterm(ma: u32) -> Option<u8> {
    if ma < 100 || ma > 250 {
        return None;
    }
    Some((((ma - 100) / 50) as u8) & 0x03)
}

/// Safety timer field.
#[inline]
#[must_use]
#[allow(clippy::arithmetic_side_effects, clippy::cast_possible_truncation)]
pub const fn encode_tchg(mins: u32) -> Option<u8> {
    if mins < 4 || mins > 512 {
        return None;
    }
    Some((((mins - 1) / 4) as u8) & 0x7F)
}
