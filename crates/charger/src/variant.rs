//! Silicon variant and the workaround capabilities it implies.
//!
//! Every revision-specific register sequence in the engine is gated on a
//! [`Capabilities`] flag resolved once here, never on the variant itself.

/// Charger block family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ChipVariant {
    /// Full switch-mode battery block with a DC input path.
    Smbb {
        /// Silicon revision; revision 0 lacks the VBAT ADC channel.
        revision: u8,
    },
    /// Reduced block without a DC input path.
    Smbbp,
    /// Cost-reduced linear variant.
    Smbcl,
}

impl Default for ChipVariant {
    fn default() -> Self {
        Self::Smbb { revision: 1 }
    }
}

/// Workarounds and optional blocks enabled for a [`ChipVariant`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Capabilities {
    /// Bracket USB input-current writes with the comparator override.
    pub vcp_workaround: bool,
    /// A DC input path exists.
    pub has_dc_path: bool,
    /// Switch the buck clock to software control on a coarse USB detect.
    pub coarse_detect_clock_workaround: bool,
    /// Battery voltage can be sampled.
    pub battery_voltage_adc: bool,
}

impl ChipVariant {
    /// Resolve the capability set of this variant.
    pub const fn capabilities(self) -> Capabilities {
        match self {
            Self::Smbb { revision } => Capabilities {
                vcp_workaround: revision > 0,
                has_dc_path: true,
                coarse_detect_clock_workaround: true,
                battery_voltage_adc: revision > 0,
            },
            Self::Smbbp => Capabilities {
                vcp_workaround: false,
                has_dc_path: false,
                coarse_detect_clock_workaround: false,
                battery_voltage_adc: true,
            },
            Self::Smbcl => Capabilities {
                vcp_workaround: false,
                has_dc_path: false,
                coarse_detect_clock_workaround: false,
                battery_voltage_adc: true,
            },
        }
    }
}
