//! Channel-backed state publication.
//!
//! [`ChannelSink`] turns every [`Sink`] call into a [`ChargerNotice`] on a
//! bounded channel. Consumers pull current values back through the engine
//! accessors; a notice only says what changed.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::{Channel, Sender};

use platform::{DockState, Domain, Sink};

/// Depth of the notice channel.
pub const NOTICE_DEPTH: usize = 16;

/// Notice channel type.
pub type NoticeChannel = Channel<CriticalSectionRawMutex, ChargerNotice, NOTICE_DEPTH>;

/// Global notice channel drained by the power-supply consumers.
pub static CHARGER_NOTICES: NoticeChannel = Channel::new();

/// One published state change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ChargerNotice {
    /// Something in the domain changed.
    Changed(Domain),
    /// Input presence changed.
    Present(Domain, bool),
    /// Dock state changed.
    Dock(DockState),
    /// All-inputs-unplugged indication raised or released.
    Unplugged(bool),
}

/// [`Sink`] that forwards into a notice channel, dropping on overflow.
pub struct ChannelSink<'a> {
    tx: Sender<'a, CriticalSectionRawMutex, ChargerNotice, NOTICE_DEPTH>,
    dropped: u32,
}

impl<'a> ChannelSink<'a> {
    /// Publish into `channel`.
    pub fn new(channel: &'a NoticeChannel) -> Self {
        Self {
            tx: channel.sender(),
            dropped: 0,
        }
    }

    /// Notices lost to a full channel since creation.
    pub fn dropped(&self) -> u32 {
        self.dropped
    }

    fn publish(&mut self, notice: ChargerNotice) {
        if self.tx.try_send(notice).is_err() {
            self.dropped = self.dropped.saturating_add(1);
            warn!("charger notice dropped ({} total)", self.dropped);
        }
    }
}

impl ChannelSink<'static> {
    /// Publish into [`CHARGER_NOTICES`].
    pub fn global() -> Self {
        Self::new(&CHARGER_NOTICES)
    }
}

impl Sink for ChannelSink<'_> {
    fn notify_changed(&mut self, domain: Domain) {
        self.publish(ChargerNotice::Changed(domain));
    }

    fn set_present(&mut self, domain: Domain, present: bool) {
        self.publish(ChargerNotice::Present(domain, present));
    }

    fn dock_changed(&mut self, state: DockState) {
        self.publish(ChargerNotice::Dock(state));
    }

    fn unplug_indication(&mut self, unplugged: bool) {
        self.publish(ChargerNotice::Unplugged(unplugged));
    }
}
