use embedded_can::Id;

use super::{Bit16Mode, Bit32Mode, CanFilter, FilterMode, FilterOptions, ListMode, MaskMode};

const IDE: u32 = 1 << 2;
const RTR: u32 = 1 << 1;

/// 32-bit image `STID[10:0] EXID[17:0] IDE RTR 0`.
pub fn id_image(id: Id, opts: &FilterOptions) -> u32 {
    let rtr = if opts.use_rtr { RTR } else { 0 };

    match id {
        Id::Standard(id) => ((id.as_raw() as u32) << 21) | rtr,
        Id::Extended(id) => (id.as_raw() << 3) | IDE | rtr,
    }
}

impl<MODE: FilterMode> CanFilter<Bit32Mode, MODE> {
    pub fn use_16bit(self) -> CanFilter<Bit16Mode, MODE> {
        CanFilter {
            id_mask: self.id_mask,
            id_value: self.id_value,
            mode: self.mode,
            bank: self.bank,
            bit_mode: Bit16Mode,
        }
    }
}

impl CanFilter<Bit32Mode, ListMode> {
    pub fn new_id_list() -> Self {
        Self {
            bank: 0,
            bit_mode: Bit32Mode,
            mode: ListMode,

            id_mask: 0,
            id_value: 0,
        }
    }

    pub fn get(&mut self, index: usize) -> Option<Bit32IdReg> {
        match index {
            0 => Some(Bit32IdReg(&mut self.id_value)),
            1 => Some(Bit32IdReg(&mut self.id_mask)),
            _ => None,
        }
    }
}

impl CanFilter<Bit32Mode, MaskMode> {
    /// Creates a filter that accepts all frames
    pub fn accept_all() -> Self {
        Self::new_id_mask()
    }

    pub fn new_id_mask() -> Self {
        Self {
            bank: 0,
            bit_mode: Bit32Mode,
            mode: MaskMode,

            id_mask: 0,
            id_value: 0,
        }
    }

    pub fn get(&mut self) -> Bit32MaskReg {
        Bit32MaskReg {
            id: &mut self.id_value,
            mask: &mut self.id_mask,
        }
    }
}

pub struct Bit32IdReg<'a>(&'a mut u32);

impl Bit32IdReg<'_> {
    pub fn set(&mut self, id: Id, opts: FilterOptions) {
        *self.0 = id_image(id, &opts);
    }
}

pub struct Bit32MaskReg<'a> {
    id: &'a mut u32,
    mask: &'a mut u32,
}

impl Bit32MaskReg<'_> {
    /// Matches ids whose bits selected by `mask` equal those of `id`. The
    /// IDE bit is always compared, RTR only when `opts.use_rtr` is set.
    pub fn set(&mut self, id: Id, mask: Id, opts: FilterOptions) {
        *self.id = id_image(id, &opts);
        *self.mask = id_image(mask, &opts) | IDE;
    }
}

#[cfg(test)]
mod tests {
    use embedded_can::{ExtendedId, StandardId};

    use super::*;

    #[test]
    fn standard_id_goes_to_top_bits() {
        let id = Id::Standard(StandardId::new(0x123).unwrap());
        assert_eq!(id_image(id, &FilterOptions::default()), 0x123 << 21);
    }

    #[test]
    fn extended_id_sets_ide() {
        let id = Id::Extended(ExtendedId::new(0x0BAD_C0DE).unwrap());
        let opts = FilterOptions {
            use_rtr: true,
            use_extended_id: true,
        };
        assert_eq!(id_image(id, &opts), (0x0BAD_C0DE << 3) | 0b110);
    }

    #[test]
    fn list_holds_two_ids() {
        let mut filter = CanFilter::new_id_list();
        let a = Id::Standard(StandardId::new(0x10).unwrap());
        let b = Id::Standard(StandardId::new(0x20).unwrap());
        filter.get(0).unwrap().set(a, FilterOptions::default());
        filter.get(1).unwrap().set(b, FilterOptions::default());
        assert!(filter.get(2).is_none());
        assert_eq!(filter.id_value, 0x10 << 21);
        assert_eq!(filter.id_mask, 0x20 << 21);
    }

    #[test]
    fn mask_always_compares_ide() {
        let mut filter = CanFilter::new_id_mask();
        let id = Id::Standard(StandardId::new(0x120).unwrap());
        let mask = Id::Standard(StandardId::new(0x7F0).unwrap());
        filter.get().set(id, mask, FilterOptions::default());
        assert_eq!(filter.id_value, 0x120 << 21);
        assert_eq!(filter.id_mask, (0x7F0 << 21) | IDE);
        assert_eq!(CanFilter::accept_all().id_mask, 0);
    }
}
