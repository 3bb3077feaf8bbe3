use crate::{error::Error, port::PortMask};

/// Tracks which pins of each port have been handed out.
///
/// Claims last until reset. Setup routines run one after another during init,
/// each taking the ledger by `&mut`, so a pin can only ever end up with one
/// owner.
pub struct PinLedger<const PORTS: usize> {
    usable: [PortMask; PORTS],
    claimed: [PortMask; PORTS],
}

impl<const PORTS: usize> PinLedger<PORTS> {
    /// `usable` is the board's table of pins that may be claimed at all.
    pub const fn new(usable: [PortMask; PORTS]) -> Self {
        Self { usable, claimed: [0; PORTS] }
    }

    /// Claim every pin in `mask` on `port`, or none of them.
    pub fn claim(&mut self, port: u8, mask: PortMask) -> Result<(), Error> {
        let index = port as usize;
        let Some(&usable) = self.usable.get(index) else {
            error!("claim on missing port {}", port);
            return Err(Error::UnusablePin);
        };

        if mask & !usable != 0 {
            error!("port {} pins {=u8:#b} not usable", port, mask & !usable);
            return Err(Error::UnusablePin);
        }

        let claimed = &mut self.claimed[index];
        if *claimed & mask != 0 {
            error!("port {} pins {=u8:#b} already claimed", port, *claimed & mask);
            return Err(Error::PinMappingConflict);
        }

        *claimed |= mask;
        trace!("port {} claimed {=u8:#b}", port, mask);
        Ok(())
    }

    /// Pins of `port` claimed so far.
    pub fn claimed(&self, port: u8) -> PortMask {
        self.claimed.get(port as usize).copied().unwrap_or(0)
    }

    pub fn usable(&self, port: u8) -> PortMask {
        self.usable.get(port as usize).copied().unwrap_or(0)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    const USABLE: [PortMask; 3] = [0xff, 0xff, 0x0f];

    #[test]
    fn overlapping_claim_fails_and_leaves_ledger_alone() {
        for mask_a in [0x01u8, 0x0f, 0x90, 0xff] {
            for mask_b in [0x01u8, 0x03, 0x80, 0x18] {
                if mask_a & mask_b == 0 {
                    continue;
                }
                let mut ledger = PinLedger::new(USABLE);
                assert_eq!(ledger.claim(1, mask_a), Ok(()));
                assert_eq!(ledger.claim(1, mask_b), Err(Error::PinMappingConflict));
                assert_eq!(ledger.claimed(1), mask_a);
                assert_eq!(ledger.claimed(0), 0);
            }
        }
    }

    #[test]
    fn disjoint_claims_accumulate() {
        let mut ledger = PinLedger::new(USABLE);
        ledger.claim(0, 0b0000_0011).unwrap();
        ledger.claim(0, 0b1100_0000).unwrap();
        ledger.claim(2, 0b0000_0100).unwrap();
        assert_eq!(ledger.claimed(0), 0b1100_0011);
        assert_eq!(ledger.claimed(2), 0b0000_0100);
    }

    #[test]
    fn same_bit_on_other_port_is_not_a_conflict() {
        let mut ledger = PinLedger::new(USABLE);
        ledger.claim(0, 0x10).unwrap();
        assert_eq!(ledger.claim(1, 0x10), Ok(()));
    }

    #[test]
    fn claims_outside_the_board_are_rejected() {
        let mut ledger = PinLedger::new(USABLE);
        assert_eq!(ledger.claim(2, 0x10), Err(Error::UnusablePin));
        assert_eq!(ledger.claim(3, 0x01), Err(Error::UnusablePin));
        assert_eq!(ledger.claimed(2), 0);
        assert_eq!(ledger.claimed(3), 0);
    }
}
