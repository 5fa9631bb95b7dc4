use embedded_can::StandardId;

use super::{Bit16Mode, CanFilter, FilterOptions, ListMode, MaskMode};

/// 16-bit image `STID[10:0] RTR IDE EXID[17:15]`.
pub fn id_image(id: StandardId, opts: &FilterOptions) -> u16 {
    (id.as_raw() << 5) | ((opts.use_rtr as u16) << 4) | ((opts.use_extended_id as u16) << 3)
}

fn write_half(reg: &mut u32, high: bool, value: u16) {
    if high {
        *reg = (*reg & 0x0000_FFFF) | ((value as u32) << 16);
    } else {
        *reg = (*reg & 0xFFFF_0000) | value as u32;
    }
}

/// One of the four 16-bit ids of a list-mode bank.
pub struct Bit16IdReg<'a> {
    reg: &'a mut u32,
    high: bool,
}

impl Bit16IdReg<'_> {
    pub fn set(&mut self, id: StandardId, opts: FilterOptions) {
        write_half(self.reg, self.high, id_image(id, &opts));
    }
}

/// One id/mask pair of a mask-mode bank; the id sits in the low half.
pub struct Bit16MaskReg<'a>(&'a mut u32);

impl Bit16MaskReg<'_> {
    pub fn set(&mut self, id: StandardId, mask: StandardId, opts: FilterOptions) {
        write_half(self.0, false, id_image(id, &opts));
        write_half(self.0, true, id_image(mask, &opts));
    }
}

impl CanFilter<Bit16Mode, ListMode> {
    pub fn get(&mut self, index: usize) -> Option<Bit16IdReg> {
        match index {
            0 => Some(Bit16IdReg {
                reg: &mut self.id_value,
                high: false,
            }),
            1 => Some(Bit16IdReg {
                reg: &mut self.id_value,
                high: true,
            }),
            2 => Some(Bit16IdReg {
                reg: &mut self.id_mask,
                high: false,
            }),
            3 => Some(Bit16IdReg {
                reg: &mut self.id_mask,
                high: true,
            }),
            _ => None,
        }
    }
}

impl From<[(StandardId, FilterOptions); 4]> for CanFilter<Bit16Mode, ListMode> {
    fn from(value: [(StandardId, FilterOptions); 4]) -> Self {
        let mut filter = CanFilter::new_id_list().use_16bit();

        for (index, (id, opts)) in value.into_iter().enumerate() {
            if let Some(mut reg) = filter.get(index) {
                reg.set(id, opts);
            }
        }

        filter
    }
}

impl CanFilter<Bit16Mode, MaskMode> {
    pub fn get(&mut self, index: usize) -> Option<Bit16MaskReg> {
        match index {
            0 => Some(Bit16MaskReg(&mut self.id_value)),
            1 => Some(Bit16MaskReg(&mut self.id_mask)),
            _ => None,
        }
    }
}
