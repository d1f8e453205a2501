/// The three resize targets of spec §4.3, in (width, height) order and
/// matching the field order of [`hof_domain_models::BlobNames`].
#[derive(Debug, Clone, Copy)]
pub struct Preset {
    pub width: u32,
    pub height: u32,
}

pub const THUMBNAIL: Preset = Preset { width: 256, height: 144 };
pub const FHD: Preset = Preset { width: 1920, height: 1080 };
pub const FOUR_K: Preset = Preset { width: 3840, height: 2160 };

/// Computes the output dimensions for `preset` given a `(src_width,
/// src_height)` source: scale preserving aspect ratio so the image meets or
/// exceeds `preset`'s bounding box on at least one axis (the other may
/// "overflow" beyond it when the source isn't exactly 16:9), but never
/// upscale past the source's own resolution.
pub fn target_dimensions(preset: Preset, src_width: u32, src_height: u32) -> (u32, u32) {
    let scale_w = preset.width as f64 / src_width as f64;
    let scale_h = preset.height as f64 / src_height as f64;
    let scale = scale_w.min(scale_h).min(1.0);

    let width = ((src_width as f64 * scale).round() as u32).max(1);
    let height = ((src_height as f64 * scale).round() as u32).max(1);
    (width, height)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scales_down_preserving_aspect_and_overflowing_the_shorter_axis() {
        // 4:3 source targeting a 16:9 box: height becomes the binding
        // constraint, width overflows past the preset's width.
        let (w, h) = target_dimensions(FHD, 4000, 3000);
        assert_eq!(h, 1080);
        assert!(w > FHD.width);
    }

    #[test]
    fn never_upscales_a_smaller_source() {
        let (w, h) = target_dimensions(FHD, 640, 360);
        assert_eq!((w, h), (640, 360));
    }
}
