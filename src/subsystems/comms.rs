use crate::controls::{ControlId, ControlStore};
use crate::log::{LogEntry, LogLevel};
use arrayvec::ArrayString;
use core::fmt::Write;
use static_assertions::const_assert_eq;

const MAX_MESSAGE_SIZE: usize = 128;

type MessageBuffer = ArrayString<MAX_MESSAGE_SIZE>;

/// Communications power supply: master plus PWR.A and PWR.B.
pub const COMMS_SUPPLY: [ControlId; 3] = [
    ControlId::CommsMaster,
    ControlId::CommsPwr1,
    ControlId::CommsPwr2,
];

/// Outernet connection array, in panel order.
pub const CONNECTION_ARRAY: [ControlId; 16] = [
    ControlId::ConnRadio,
    ControlId::ConnSatellite,
    ControlId::ConnMicrowave,
    ControlId::ConnInfrared,
    ControlId::ConnLaser,
    ControlId::ConnPlasma,
    ControlId::ConnQuantum,
    ControlId::ConnNeural,
    ControlId::ConnPsionic,
    ControlId::ConnGravitic,
    ControlId::ConnTemporal,
    ControlId::ConnDimensional,
    ControlId::ConnSubspace,
    ControlId::ConnHyperwave,
    ControlId::ConnTachyon,
    ControlId::ConnDarkmatter,
];

const_assert_eq!(CONNECTION_ARRAY.len(), 16);

/// Signal bars shown with the whole array linked.
pub const MAX_SIGNAL_BARS: u8 = 5;

pub fn supply_active(controls: &ControlStore) -> bool {
    controls.all_on(&COMMS_SUPPLY)
}

pub fn linked_channels(controls: &ControlStore) -> usize {
    CONNECTION_ARRAY.iter().filter(|id| controls.is_on(**id)).count()
}

/// The array mirrors the communications status: all on while online, all off
/// otherwise.
pub fn array_in_step(controls: &ControlStore, online: bool) -> bool {
    CONNECTION_ARRAY.iter().all(|id| controls.is_on(*id) == online)
}

/// Writes the whole array in one batch and returns how many toggles moved.
pub fn sync_array(controls: &mut ControlStore, online: bool) -> usize {
    CONNECTION_ARRAY
        .iter()
        .filter(|id| controls.force_switch(**id, online))
        .count()
}

pub fn signal_bars(online: bool) -> u8 {
    if online {
        MAX_SIGNAL_BARS
    } else {
        0
    }
}

pub fn sync_entry(online: bool, moved: usize, now: u64) -> LogEntry {
    let mut message = MessageBuffer::new();
    let _ = if online {
        write!(message, "OUTERNET ARRAY LINKED - {} channels brought online", moved)
    } else {
        write!(message, "OUTERNET ARRAY DROPPED - {} channels disconnected", moved)
    };
    LogEntry::new(now, LogLevel::Info, message.as_str(), "Communications")
}

/// Transmission request; only logged while communications are online.
pub fn transmit_entry(online: bool, now: u64) -> Option<LogEntry> {
    online.then(|| {
        LogEntry::new(
            now,
            LogLevel::Info,
            "TRANSMISSION STARTED - Broadcasting on all active channels",
            "Nav4 Console",
        )
    })
}

pub fn receive_entry(online: bool, now: u64) -> Option<LogEntry> {
    online.then(|| {
        LogEntry::new(
            now,
            LogLevel::Info,
            "RECEIVE MODE ACTIVATED - Listening for incoming signals",
            "Nav4 Console",
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_supply_requires_all_three() {
        let mut controls = ControlStore::new();
        controls.force_switch(ControlId::CommsMaster, true);
        controls.force_switch(ControlId::CommsPwr1, true);
        assert!(!supply_active(&controls));
        controls.force_switch(ControlId::CommsPwr2, true);
        assert!(supply_active(&controls));
    }

    #[test]
    fn test_array_sync() {
        let mut controls = ControlStore::new();
        assert!(array_in_step(&controls, false));
        assert!(!array_in_step(&controls, true));

        assert_eq!(sync_array(&mut controls, true), 16);
        assert_eq!(linked_channels(&controls), 16);
        assert!(array_in_step(&controls, true));

        controls.toggle("conn-laser");
        assert!(!array_in_step(&controls, true));
        assert_eq!(sync_array(&mut controls, true), 1);
    }

    #[test]
    fn test_transmit_gated_on_link() {
        assert!(transmit_entry(false, 0).is_none());
        assert!(receive_entry(false, 0).is_none());
        let entry = transmit_entry(true, 5).map(|e| e.message);
        assert_eq!(
            entry.as_deref(),
            Some("TRANSMISSION STARTED - Broadcasting on all active channels")
        );
    }

    #[test]
    fn test_sync_entry_message() {
        let entry = sync_entry(true, 16, 0);
        assert_eq!(entry.message, "OUTERNET ARRAY LINKED - 16 channels brought online");
    }
}
