//! Typed views of the real-time interrupt status bytes.

use super::registers::{
    BATT_PRES_RT, BAT_FET_ON_RT, BAT_TEMP_OK_RT, CHG_DONE_RT, CHG_FAILED_RT, CHG_GONE_RT,
    COARSE_DET_USB_RT, FAST_CHG_ON_RT, TRKL_CHG_ON_RT, USBIN_VALID_RT, VBAT_DET_LOW_RT,
    VDD_LOOP_RT,
};

/// Charger core status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ChargerRt(pub u8);

impl ChargerRt {
    /// Charge done latched.
    pub const fn charge_done(self) -> bool {
        self.0 & CHG_DONE_RT != 0
    }

    /// Safety timer expired.
    pub const fn charge_failed(self) -> bool {
        self.0 & CHG_FAILED_RT != 0
    }

    /// Fast (constant-current or constant-voltage) charge running.
    pub const fn fast_charge_on(self) -> bool {
        self.0 & FAST_CHG_ON_RT != 0
    }

    /// Trickle charge running.
    pub const fn trickle_charge_on(self) -> bool {
        self.0 & TRKL_CHG_ON_RT != 0
    }

    /// Either charge phase running.
    pub const fn charging(self) -> bool {
        self.fast_charge_on() || self.trickle_charge_on()
    }

    /// Battery voltage is below the recharge threshold.
    pub const fn vbat_det_low(self) -> bool {
        self.0 & VBAT_DET_LOW_RT != 0
    }
}

/// Buck status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BuckRt(pub u8);

impl BuckRt {
    /// Regulating in the constant-voltage loop.
    pub const fn in_cv_loop(self) -> bool {
        self.0 & VDD_LOOP_RT != 0
    }
}

/// Battery interface status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BatIfRt(pub u8);

impl BatIfRt {
    /// Battery FET closed.
    pub const fn fet_on(self) -> bool {
        self.0 & BAT_FET_ON_RT != 0
    }

    /// Temperature within limits.
    pub const fn temp_ok(self) -> bool {
        self.0 & BAT_TEMP_OK_RT != 0
    }

    /// Battery detected.
    pub const fn present(self) -> bool {
        self.0 & BATT_PRES_RT != 0
    }
}

/// USB path status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct UsbRt(pub u8);

impl UsbRt {
    /// Source disappeared while the charger was drawing from it.
    pub const fn charger_gone(self) -> bool {
        self.0 & CHG_GONE_RT != 0
    }

    /// USB input valid.
    pub const fn input_valid(self) -> bool {
        self.0 & USBIN_VALID_RT != 0
    }

    /// Coarse detect comparator tripped.
    pub const fn coarse_detect(self) -> bool {
        self.0 & COARSE_DET_USB_RT != 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn charger_rt_phases() {
        let rt = ChargerRt(FAST_CHG_ON_RT | VBAT_DET_LOW_RT);
        assert!(rt.fast_charge_on());
        assert!(rt.charging());
        assert!(!rt.trickle_charge_on());
        assert!(rt.vbat_det_low());
        assert!(!ChargerRt(0).charging());
    }

    #[test]
    fn buck_cv_loop_bit() {
        assert!(BuckRt(0x40).in_cv_loop());
        assert!(!BuckRt(0xBF).in_cv_loop());
    }

    #[test]
    fn bat_if_and_usb_bits() {
        let bat = BatIfRt(0x05);
        assert!(bat.fet_on() && bat.present() && !bat.temp_ok());
        let usb = UsbRt(0x04);
        assert!(usb.charger_gone() && !usb.input_valid());
    }
}
