// Copyright the wfd-source authors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The fixed CEA/VESA/HH resolution tables.
//!
//! Each family is a 32-bit mask over a standardized list of
//! `(width, height, framerate, interleaved)` modes. The bit→mode mapping
//! below is transcribed from `wfd_get_prefered_resolution()` in the
//! original `rtsp-client-wfd.c`, which switches on the single surviving bit
//! in declaration order — that declaration order *is* the bit assignment
//! (bit 0 is the first case, bit 1 the second, etc).

/// A negotiated resolution: pixel size, framerate, and scan mode.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ResolutionMode {
    pub width: u32,
    pub height: u32,
    pub framerate: u32,
    pub interleaved: bool,
}

macro_rules! resolution_enum {
    ($name:ident, $mask_ty:ty, [$($variant:ident = $bit:expr => ($w:expr, $h:expr, $fps:expr, $il:expr)),+ $(,)?]) => {
        #[derive(Clone, Copy, Debug, Eq, PartialEq)]
        #[repr($mask_ty)]
        #[allow(non_camel_case_types)]
        pub enum $name {
            $($variant = 1 << $bit,)+
        }

        impl $name {
            pub const UNKNOWN: $mask_ty = 0;

            /// All bit values defined for this family, from bit 0 up.
            pub const ALL: &'static [$name] = &[$($name::$variant,)+];

            pub fn mode(self) -> ResolutionMode {
                match self {
                    $($name::$variant => ResolutionMode {
                        width: $w,
                        height: $h,
                        framerate: $fps,
                        interleaved: $il,
                    },)+
                }
            }

            pub fn bit(self) -> $mask_ty {
                self as $mask_ty
            }
        }
    };
}

resolution_enum!(CeaResolution, u32, [
    Cea640x480P60   = 0  => (640, 480, 60, false),
    Cea720x480P60   = 1  => (720, 480, 60, false),
    Cea720x480I60   = 2  => (720, 480, 60, true),
    Cea720x576P50   = 3  => (720, 576, 50, false),
    Cea720x576I50   = 4  => (720, 576, 50, true),
    Cea1280x720P30  = 5  => (1280, 720, 30, false),
    Cea1280x720P60  = 6  => (1280, 720, 60, false),
    Cea1920x1080P30 = 7  => (1920, 1080, 30, false),
    Cea1920x1080P60 = 8  => (1920, 1080, 60, false),
    Cea1920x1080I60 = 9  => (1920, 1080, 60, true),
    Cea1280x720P25  = 10 => (1280, 720, 25, false),
    Cea1280x720P50  = 11 => (1280, 720, 50, false),
    Cea1920x1080P25 = 12 => (1920, 1080, 25, false),
    Cea1920x1080P50 = 13 => (1920, 1080, 50, false),
    Cea1920x1080I50 = 14 => (1920, 1080, 50, true),
    Cea1280x720P24  = 15 => (1280, 720, 24, false),
    Cea1920x1080P24 = 16 => (1920, 1080, 24, false),
]);

resolution_enum!(VesaResolution, u32, [
    Vesa800x600P30   = 0  => (800, 600, 30, false),
    Vesa800x600P60   = 1  => (800, 600, 60, false),
    Vesa1024x768P30  = 2  => (1024, 768, 30, false),
    Vesa1024x768P60  = 3  => (1024, 768, 60, false),
    Vesa1152x864P30  = 4  => (1152, 864, 30, false),
    Vesa1152x864P60  = 5  => (1152, 864, 60, false),
    Vesa1280x768P30  = 6  => (1280, 768, 30, false),
    Vesa1280x768P60  = 7  => (1280, 768, 60, false),
    Vesa1280x800P30  = 8  => (1280, 800, 30, false),
    Vesa1280x800P60  = 9  => (1280, 800, 60, false),
    Vesa1360x768P30  = 10 => (1360, 768, 30, false),
    Vesa1360x768P60  = 11 => (1360, 768, 60, false),
    Vesa1366x768P30  = 12 => (1366, 768, 30, false),
    Vesa1366x768P60  = 13 => (1366, 768, 60, false),
    Vesa1280x1024P30 = 14 => (1280, 1024, 30, false),
    Vesa1280x1024P60 = 15 => (1280, 1024, 60, false),
    Vesa1400x1050P30 = 16 => (1400, 1050, 30, false),
    Vesa1400x1050P60 = 17 => (1400, 1050, 60, false),
    Vesa1440x900P30  = 18 => (1440, 900, 30, false),
    Vesa1440x900P60  = 19 => (1440, 900, 60, false),
    Vesa1600x900P30  = 20 => (1600, 900, 30, false),
    Vesa1600x900P60  = 21 => (1600, 900, 60, false),
    Vesa1600x1200P30 = 22 => (1600, 1200, 30, false),
    Vesa1600x1200P60 = 23 => (1600, 1200, 60, false),
    Vesa1680x1024P30 = 24 => (1680, 1024, 30, false),
    Vesa1680x1024P60 = 25 => (1680, 1024, 60, false),
    Vesa1680x1050P30 = 26 => (1680, 1050, 30, false),
    Vesa1680x1050P60 = 27 => (1680, 1050, 60, false),
    Vesa1920x1200P30 = 28 => (1920, 1200, 30, false),
    Vesa1920x1200P60 = 29 => (1920, 1200, 60, false),
]);

resolution_enum!(HhResolution, u32, [
    Hh800x480P30 = 0  => (800, 480, 30, false),
    Hh800x480P60 = 1  => (800, 480, 60, false),
    Hh854x480P30 = 2  => (854, 480, 30, false),
    Hh854x480P60 = 3  => (854, 480, 60, false),
    Hh864x480P30 = 4  => (864, 480, 30, false),
    Hh864x480P60 = 5  => (864, 480, 60, false),
    Hh640x360P30 = 6  => (640, 360, 30, false),
    Hh640x360P60 = 7  => (640, 360, 60, false),
    Hh960x540P30 = 8  => (960, 540, 30, false),
    Hh960x540P60 = 9  => (960, 540, 60, false),
    Hh848x480P30 = 10 => (848, 480, 30, false),
    Hh848x480P60 = 11 => (848, 480, 60, false),
]);

/// Looks up the `(width, height, framerate, interleaved)` mode for a single
/// set bit within `family`'s mask, or `None` if no defined mode has that
/// bit (eg the bit is unused, or more than one bit was set).
pub fn mode_for(family: super::VideoNativeResolutionFamily, bit: u32) -> Option<ResolutionMode> {
    use super::VideoNativeResolutionFamily as F;
    match family {
        F::Cea => CeaResolution::ALL
            .iter()
            .find(|r| r.bit() == bit)
            .map(|r| r.mode()),
        F::Vesa => VesaResolution::ALL
            .iter()
            .find(|r| r.bit() == bit)
            .map(|r| r.mode()),
        F::Hh => HhResolution::ALL
            .iter()
            .find(|r| r.bit() == bit)
            .map(|r| r.mode()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cea_has_seventeen_modes() {
        assert_eq!(CeaResolution::ALL.len(), 17);
    }

    #[test]
    fn vesa_has_thirty_modes() {
        assert_eq!(VesaResolution::ALL.len(), 30);
    }

    #[test]
    fn hh_has_twelve_modes() {
        assert_eq!(HhResolution::ALL.len(), 12);
    }

    #[test]
    fn bit_values_are_distinct_powers_of_two() {
        for family in [
            CeaResolution::ALL.iter().map(|r| r.bit()).collect::<Vec<_>>(),
        ] {
            let mut seen = 0u32;
            for bit in family {
                assert_eq!(bit & seen, 0, "bit {:#x} reused", bit);
                assert_eq!(bit.count_ones(), 1);
                seen |= bit;
            }
        }
    }

    #[test]
    fn cea_1280x720p30_is_1280x720_at_30fps() {
        let m = CeaResolution::Cea1280x720P30.mode();
        assert_eq!((m.width, m.height, m.framerate, m.interleaved), (1280, 720, 30, false));
    }
}
