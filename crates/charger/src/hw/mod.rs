//! Register-level charger block.
//!
//! [`ChargerHw`] turns semantic quantities (millivolts, milliamps, minutes)
//! into register writes and raw status bytes into typed views. It holds no
//! policy: gating on OVP, charging-disabled or battery presence happens in
//! the engine.

pub mod registers;
pub mod status;

use embassy_time::Duration;
use platform::{BusError, InputPath, RegisterPort};

use crate::config::{BpdScheme, ChargerConfig, PeripheralBases};
use crate::error::ChargerError;
use crate::variant::Capabilities;
use registers as reg;
pub use status::{BatIfRt, BuckRt, ChargerRt, UsbRt};

/// Settling time between the input-current write and releasing the VCP
/// comparator override.
const VCP_SETTLE: Duration = Duration::from_micros(200);

/// Register access to the charger, buck, battery-interface, input-path and
/// misc blocks.
pub struct ChargerHw<R> {
    regs: R,
    bases: PeripheralBases,
    caps: Capabilities,
    max_input_usb_ma: u32,
}

impl<R: RegisterPort> ChargerHw<R> {
    /// Bind `regs` to the block layout of `config`.
    pub fn new(regs: R, config: &ChargerConfig) -> Self {
        Self {
            regs,
            bases: config.bases,
            caps: config.variant.capabilities(),
            max_input_usb_ma: config.max_input_usb_ma,
        }
    }

    /// Capabilities of the bound silicon.
    pub fn capabilities(&self) -> Capabilities {
        self.caps
    }

    /// The underlying register port.
    pub fn registers(&self) -> &R {
        &self.regs
    }

    /// The underlying register port, mutably.
    pub fn registers_mut(&mut self) -> &mut R {
        &mut self.regs
    }

    // ── Setters ──────────────────────────────────────────────────────────

    /// Program the input current limit of `path`.
    pub fn set_input_current_limit(&mut self, path: InputPath, ma: u32) -> Result<(), ChargerError> {
        match path {
            InputPath::Usb => self.set_usb_current_limit(ma),
            InputPath::Dc => self.set_dc_current_limit(ma),
        }
    }

    /// Program IUSB_MAX, capped at the configured USB input maximum.
    pub fn set_usb_current_limit(&mut self, ma: u32) -> Result<(), ChargerError> {
        let addr = at(self.bases.usb, reg::PATH_I_MAX);
        if ma == reg::I_MAX_MIN_MA || ma == reg::I_MAX_150_MA {
            let raw = reg::encode_input_current(ma).ok_or(ChargerError::InvalidValue)?;
            return Ok(self.regs.write_byte(addr, raw)?);
        }
        reg::encode_input_current(ma).ok_or(ChargerError::InvalidValue)?;
        let capped = if self.max_input_usb_ma != 0 {
            ma.min(self.max_input_usb_ma)
        } else {
            ma
        };
        let raw = reg::encode_input_current(capped).ok_or(ChargerError::InvalidValue)?;

        if self.caps.vcp_workaround {
            self.vcp_override(true)?;
        }
        let written = self.regs.write_byte(addr, raw);
        if self.caps.vcp_workaround {
            embassy_time::block_for(VCP_SETTLE);
            self.vcp_override(false)?;
        }
        Ok(written?)
    }

    /// Program IDC_MAX.
    pub fn set_dc_current_limit(&mut self, ma: u32) -> Result<(), ChargerError> {
        let raw = reg::encode_input_current(ma).ok_or(ChargerError::InvalidValue)?;
        Ok(self.regs.write_byte(at(self.bases.dc, reg::PATH_I_MAX), raw)?)
    }

    /// Program VDD_MAX to `mv + trim_mv`. Returns the applied voltage.
    pub fn set_vddmax(&mut self, mv: u32, trim_mv: i32) -> Result<u32, ChargerError> {
        if !(3400..=reg::V_MAX_MV).contains(&mv) {
            return Err(ChargerError::InvalidValue);
        }
        let applied = mv.checked_add_signed(trim_mv).ok_or(ChargerError::InvalidValue)?;
        let raw = reg::encode_vdd(applied).ok_or(ChargerError::InvalidValue)?;
        self.regs.write_byte(at(self.bases.chgr, reg::CHGR_VDD_MAX), raw)?;
        Ok(applied)
    }

    /// Program VDD_SAFE.
    pub fn set_vddsafe(&mut self, mv: u32) -> Result<(), ChargerError> {
        if mv > reg::V_MAX_MV {
            return Err(ChargerError::InvalidValue);
        }
        let raw = reg::encode_vdd(mv).ok_or(ChargerError::InvalidValue)?;
        Ok(self.regs.write_byte(at(self.bases.chgr, reg::CHGR_VDD_SAFE), raw)?)
    }

    /// Program the recharge detect threshold.
    pub fn set_vbatdet(&mut self, mv: u32) -> Result<(), ChargerError> {
        let raw = reg::encode_vbatdet(mv).ok_or(ChargerError::InvalidValue)?;
        Ok(self.regs.write_byte(at(self.bases.chgr, reg::CHGR_VBAT_DET), raw)?)
    }

    /// Program the input voltage floor.
    pub fn set_vinmin(&mut self, mv: u32) -> Result<(), ChargerError> {
        let raw = reg::encode_vinmin(mv).ok_or(ChargerError::InvalidValue)?;
        Ok(self.regs.masked_write(at(self.bases.chgr, reg::CHGR_VIN_MIN), 0x1F, raw)?)
    }

    /// Program the battery current ceiling.
    pub fn set_ibatmax(&mut self, ma: u32) -> Result<(), ChargerError> {
        let raw = reg::encode_ibatmax(ma).ok_or(ChargerError::InvalidValue)?;
        Ok(self.regs.masked_write(at(self.bases.chgr, reg::CHGR_IBAT_MAX), 0x3F, raw)?)
    }

    /// Program the absolute battery current ceiling.
    pub fn set_ibatsafe(&mut self, ma: u32) -> Result<(), ChargerError> {
        let raw = reg::encode_ibatsafe(ma).ok_or(ChargerError::InvalidValue)?;
        Ok(self.regs.masked_write(at(self.bases.chgr, reg::CHGR_IBAT_SAFE), 0x3F, raw)?)
    }

    /// Program the termination current.
    pub fn set_iterm(&mut self, ma: u32) -> Result<(), ChargerError> {
        let raw = reg::encode_iterm(ma).ok_or(ChargerError::InvalidValue)?;
        Ok(self.regs.masked_write(at(self.bases.chgr, reg::CHGR_IBAT_TERM_CHGR), 0x03, raw)?)
    }

    /// Program the safety timer.
    pub fn set_tchg(&mut self, mins: u32) -> Result<(), ChargerError> {
        let raw = reg::encode_tchg(mins).ok_or(ChargerError::InvalidValue)?;
        Ok(self.regs.masked_write(at(self.bases.chgr, reg::CHGR_TCHG_MAX), 0x7F, raw)?)
    }

    /// Charge enable bit.
    pub fn set_charge_enable(&mut self, enable: bool) -> Result<(), BusError> {
        self.regs.masked_write(
            at(self.bases.chgr, reg::CHGR_CHG_CTRL),
            reg::CHG_EN,
            if enable { reg::CHG_EN } else { 0 },
        )
    }

    /// Force the system to run from the battery (opens the charge path).
    pub fn set_force_run_on_battery(&mut self, force: bool) -> Result<(), BusError> {
        self.regs.masked_write(
            at(self.bases.chgr, reg::CHGR_CHG_CTRL),
            reg::ON_BAT_FORCE,
            if force { reg::ON_BAT_FORCE } else { 0 },
        )
    }

    /// Suspend or release the USB input.
    pub fn set_usb_suspend(&mut self, suspend: bool) -> Result<(), BusError> {
        self.regs.masked_write(
            at(self.bases.usb, reg::USB_SUSP),
            reg::USB_SUSPEND,
            if suspend { reg::USB_SUSPEND } else { 0 },
        )
    }

    /// Clear the safety-timer charge-failed latch.
    pub fn clear_charge_failed(&mut self) -> Result<(), BusError> {
        self.regs.masked_write(
            at(self.bases.chgr, reg::CHGR_CHG_FAILED),
            reg::CHG_FAILED_CLEAR,
            reg::CHG_FAILED_CLEAR,
        )
    }

    /// Allow (`true`) or limit the buck duty cycle.
    pub fn set_duty_cycle_100p(&mut self, enable: bool) -> Result<(), BusError> {
        self.unlock(self.bases.buck)?;
        self.regs.masked_write(
            at(self.bases.buck, reg::BUCK_TEST_SMBC_MODES),
            reg::DUTY_MASK,
            if enable { reg::DUTY_100P } else { reg::DUTY_LIMITED },
        )
    }

    /// Enable or override the charge-done comparator.
    pub fn set_charge_done_logic(&mut self, enable: bool) -> Result<(), BusError> {
        self.unlock(self.bases.buck)?;
        self.regs.masked_write(
            at(self.bases.buck, reg::BUCK_COMP_OVR1),
            reg::CHG_DONE_OVR_MASK,
            if enable { 0x00 } else { reg::CHG_DONE_OVR_OFF },
        )
    }

    /// Switch the buck clock between software and hardware control.
    pub fn set_buck_clock_software(&mut self, software: bool) -> Result<(), BusError> {
        self.regs.write_byte(at(self.bases.misc, reg::SEC_ACCESS), reg::SEC_UNLOCK)?;
        self.regs.write_byte(
            at(self.bases.misc, reg::MISC_CLK_CTRL),
            if software { reg::CLK_SW_CONTROLLED } else { reg::CLK_HW_CONTROLLED },
        )
    }

    fn unlock(&mut self, base: u16) -> Result<(), BusError> {
        self.regs.masked_write(at(base, reg::SEC_ACCESS), reg::SEC_UNLOCK, reg::SEC_UNLOCK)
    }

    fn vcp_override(&mut self, on: bool) -> Result<(), BusError> {
        self.regs.write_byte(at(self.bases.buck, reg::SEC_ACCESS), reg::SEC_UNLOCK)?;
        self.regs.masked_write(
            at(self.bases.buck, reg::BUCK_COMP_OVR3),
            reg::VCP_OVR_MASK,
            if on { reg::VCP_OVR_MASK } else { 0x00 },
        )
    }

    // ── Status ───────────────────────────────────────────────────────────

    /// Charger core real-time status.
    pub fn charger_rt(&mut self) -> Result<ChargerRt, BusError> {
        self.regs.read_byte(at(self.bases.chgr, reg::INT_RT_STS)).map(ChargerRt)
    }

    /// Buck real-time status.
    pub fn buck_rt(&mut self) -> Result<BuckRt, BusError> {
        self.regs.read_byte(at(self.bases.buck, reg::INT_RT_STS)).map(BuckRt)
    }

    /// Battery interface real-time status.
    pub fn bat_if_rt(&mut self) -> Result<BatIfRt, BusError> {
        self.regs.read_byte(at(self.bases.bat_if, reg::INT_RT_STS)).map(BatIfRt)
    }

    /// USB path real-time status.
    pub fn usb_rt(&mut self) -> Result<UsbRt, BusError> {
        self.regs.read_byte(at(self.bases.usb, reg::INT_RT_STS)).map(UsbRt)
    }

    /// Battery interface status register (temperature classification).
    pub fn battery_status(&mut self) -> Result<u8, BusError> {
        self.regs.read_byte(at(self.bases.bat_if, reg::STATUS))
    }

    /// USB input valid.
    pub fn usb_valid(&mut self) -> Result<bool, BusError> {
        Ok(self.regs.read_byte(at(self.bases.usb, reg::STATUS))? & reg::USB_VALID != 0)
    }

    /// DC input valid. Always `false` without a DC path.
    pub fn dc_valid(&mut self) -> Result<bool, BusError> {
        if !self.caps.has_dc_path {
            return Ok(false);
        }
        Ok(self.regs.read_byte(at(self.bases.dc, reg::INT_RT_STS))? & reg::DCIN_VALID_RT != 0)
    }

    /// USB path in host (OTG) mode.
    pub fn otg_enabled(&mut self) -> Result<bool, BusError> {
        Ok(self.regs.read_byte(at(self.bases.usb, reg::USB_OTG_CTL))? & reg::USB_OTG_EN != 0)
    }

    /// Battery current sign says discharging.
    pub fn battery_discharging(&mut self) -> Result<bool, BusError> {
        Ok(self.regs.read_byte(at(self.bases.chgr, reg::CHGR_IBAT_STS))? & reg::IBAT_SIGN != 0)
    }

    /// Battery detected.
    pub fn battery_present(&mut self) -> Result<bool, BusError> {
        self.bat_if_rt().map(BatIfRt::present)
    }

    // ── Initialization ───────────────────────────────────────────────────

    /// Program the charger core from `config`.
    pub fn init_charger(&mut self, config: &ChargerConfig) -> Result<(), ChargerError> {
        self.set_vinmin(config.min_voltage_mv)?;
        self.set_vddmax(config.max_voltage_mv, 0)?;
        self.set_vddsafe(config.safe_voltage_mv)?;
        self.set_vbatdet(config.resume_voltage_mv())?;
        self.set_ibatmax(config.max_battery_current_ma)?;
        if config.term_current_ma != 0 {
            self.set_iterm(config.term_current_ma)?;
        }
        self.set_ibatsafe(config.safe_current_ma)?;
        self.set_tchg(config.tchg_mins)?;
        self.regs
            .write_byte(at(self.bases.chgr, reg::CHGR_CHG_WDOG_TIME), reg::WDOG_DISABLED)?;
        self.regs
            .write_byte(at(self.bases.chgr, reg::CHGR_IBAT_TERM_CHGR), reg::ANALOG_EOC)?;
        Ok(())
    }

    /// Program the buck block.
    pub fn init_buck(&mut self, duty_cycle_100p: bool) -> Result<(), BusError> {
        self.set_charge_done_logic(false)?;
        self.regs.masked_write(
            at(self.bases.buck, reg::BUCK_VBAT_REG_MODE),
            reg::VBAT_REG_NODE_SEL,
            reg::VBAT_REG_NODE_SEL,
        )?;
        if duty_cycle_100p {
            self.set_duty_cycle_100p(true)?;
        }
        Ok(())
    }

    /// Program the battery interface block.
    pub fn init_bat_if(&mut self, bpd: BpdScheme) -> Result<(), BusError> {
        let sel = match bpd {
            BpdScheme::BatThm => reg::BAT_THM_EN,
            BpdScheme::BatId => reg::BAT_ID_EN,
            BpdScheme::BatThmBatId => reg::BAT_THM_EN | reg::BAT_ID_EN,
        };
        self.regs
            .masked_write(at(self.bases.bat_if, reg::BAT_IF_BPD_CTRL), reg::BPD_SEL_MASK, sel)?;
        self.regs.masked_write(
            at(self.bases.bat_if, reg::BAT_IF_VREF_BAT_THM_CTRL),
            reg::VREF_BAT_THM_FORCE_ON,
            reg::VREF_BAT_THM_FORCE_ON,
        )
    }

    /// Program the USB path block.
    pub fn init_usb(&mut self) -> Result<(), BusError> {
        let usb = self.bases.usb;
        self.regs.masked_write(
            at(usb, reg::USB_OVP_CTL),
            reg::USB_VALID_DEB_20MS,
            reg::USB_VALID_DEB_20MS,
        )?;
        self.regs
            .masked_write(at(usb, reg::USB_ENUM_T_STOP), reg::ENUM_T_STOP, reg::ENUM_T_STOP)?;
        self.regs.write_byte(at(usb, reg::SEC_ACCESS), reg::SEC_UNLOCK)?;
        self.regs
            .write_byte(at(usb, reg::USB_CHG_GONE_REV_BST), reg::REV_BST_DETECT_EN)
    }
}

/// Absolute address of `offset` inside the block at `base`.
pub const fn at(base: u16, offset: u16) -> u16 {
    base.wrapping_add(offset)
}
