//! Output picture geometry.
//!
//! Derives the encoded width, height and pixel aspect of a job against a
//! scanned title. Strict anamorphic keeps the cropped storage size rounded
//! down to even; every other mode snaps to the profile modulus.

use serde::{Deserialize, Serialize};

use super::title::{reduce_wide, Rational, Title};
use crate::job::model::EncodeJob;
use crate::task::model::{Anamorphic, Cropping};

/// Keep the requested width when the engine adjusts the picture.
pub const KEEP_WIDTH: u32 = 0x01;
/// Keep the requested height when the engine adjusts the picture.
pub const KEEP_HEIGHT: u32 = 0x02;
/// Keep the display aspect ratio.
pub const KEEP_DISPLAY_ASPECT: u32 = 0x04;

const FALLBACK_MODULUS: u32 = 2;

/// Resolved output picture geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Geometry {
    pub width: u32,
    pub height: u32,
    pub par: Rational,
}

/// Picture request handed to the engine for preview rendering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeometrySettings {
    pub crop: Cropping,
    /// Bitwise OR of the `KEEP_*` flags.
    pub keep: u32,
    pub max_width: u32,
    pub max_height: u32,
    /// Anamorphic mode code.
    pub mode: i32,
    pub modulus: u32,
    pub geometry: Geometry,
}

/// The pixel aspect the job asks to encode with.
///
/// Only custom anamorphic consults the job. Its pixel aspect wins, then the
/// display width over the storage width, then the title's own aspect.
pub fn source_par(job: &EncodeJob, title: &Title) -> Rational {
    let p = &job.profile;
    if p.anamorphic != Anamorphic::Custom {
        return title.par;
    }

    if p.pixel_aspect_x > 0 && p.pixel_aspect_y > 0 {
        return Rational::new(p.pixel_aspect_x, p.pixel_aspect_y);
    }

    let storage_width = if p.width > 0 {
        p.width
    } else {
        cropped_size(job, title).0
    };
    if p.display_width > 0 && storage_width > 0 {
        return Rational::new(p.display_width, storage_width);
    }

    title.par
}

/// Resolves the output geometry of `job` for `title`.
pub fn resolve(job: &EncodeJob, title: &Title) -> Geometry {
    let p = &job.profile;
    let modulus = effective_modulus(p.modulus);
    let (cropped_w, cropped_h) = cropped_size(job, title);
    let par = source_par(job, title);

    let max_w = bound(p.max_width, cropped_w);
    let max_h = bound(p.max_height, cropped_h);
    let requested_w = if p.width > 0 { p.width } else { cropped_w };
    let requested_h = if p.height > 0 { p.height } else { cropped_h };

    // Display aspect of the cropped source, and its storage aspect.
    let storage_aspect = cropped_w as f64 / cropped_h as f64;
    let display_aspect = storage_aspect * par.as_f64();

    match p.anamorphic {
        Anamorphic::Strict => Geometry {
            width: (cropped_w & !1).max(FALLBACK_MODULUS),
            height: (cropped_h & !1).max(FALLBACK_MODULUS),
            par: title.par.reduced(),
        },
        Anamorphic::None => {
            let aspect = if display_aspect > 0.0 {
                display_aspect
            } else {
                storage_aspect
            };
            let (width, height) = fit(
                requested_w.min(max_w),
                requested_h,
                max_w,
                max_h,
                aspect,
                p.keep_display_aspect,
                modulus,
            );
            Geometry {
                width,
                height,
                par: Rational::ONE,
            }
        }
        Anamorphic::Loose => {
            let (width, height) = fit(
                requested_w.min(max_w),
                requested_h,
                max_w,
                max_h,
                storage_aspect,
                true,
                modulus,
            );
            // Pick the pixel aspect that reproduces the source display aspect.
            let num = cropped_w as u64 * par.num as u64 * height as u64;
            let den = cropped_h as u64 * par.den.max(1) as u64 * width as u64;
            Geometry {
                width,
                height,
                par: reduce_wide(num, den),
            }
        }
        Anamorphic::Custom => {
            let (width, height) = fit(
                requested_w.min(max_w),
                requested_h,
                max_w,
                max_h,
                storage_aspect,
                p.keep_display_aspect,
                modulus,
            );
            Geometry {
                width,
                height,
                par: par.reduced(),
            }
        }
    }
}

/// Builds the engine picture request used for previews.
///
/// The embedded geometry is the requested size with the chosen pixel aspect;
/// the engine derives the output picture from it. A zero dimension leaves it
/// to the engine.
pub fn geometry_settings(job: &EncodeJob, title: &Title) -> GeometrySettings {
    let p = &job.profile;
    let mut keep = KEEP_WIDTH;
    if p.keep_display_aspect {
        keep |= KEEP_DISPLAY_ASPECT;
    }

    GeometrySettings {
        crop: p.cropping,
        keep,
        max_width: p.max_width,
        max_height: p.max_height,
        mode: p.anamorphic.code(),
        modulus: effective_modulus(p.modulus),
        geometry: Geometry {
            width: p.width,
            height: p.height,
            par: source_par(job, title),
        },
    }
}

fn effective_modulus(modulus: u32) -> u32 {
    if modulus == 0 {
        FALLBACK_MODULUS
    } else {
        modulus
    }
}

fn cropped_size(job: &EncodeJob, title: &Title) -> (u32, u32) {
    let crop = &job.profile.cropping;
    let horizontal = crop.left.max(0) as u32 + crop.right.max(0) as u32;
    let vertical = crop.top.max(0) as u32 + crop.bottom.max(0) as u32;
    (
        title.resolution.width.saturating_sub(horizontal).max(1),
        title.resolution.height.saturating_sub(vertical).max(1),
    )
}

fn bound(max: u32, source: u32) -> u32 {
    if max == 0 {
        source
    } else {
        max
    }
}

/// Snaps a width, derives or clamps the height, then re-derives the width
/// when the height hit its bound. Neither dimension exceeds its bound.
fn fit(
    width: u32,
    requested_height: u32,
    max_width: u32,
    max_height: u32,
    aspect: f64,
    keep_aspect: bool,
    modulus: u32,
) -> (u32, u32) {
    let mut width = snap_within(width as f64, max_width, modulus);
    let mut height = if keep_aspect && aspect > 0.0 {
        snap(width as f64 / aspect, modulus)
    } else {
        snap(requested_height as f64, modulus)
    };

    if height > max_height {
        height = snap_down(max_height, modulus);
        if keep_aspect && aspect > 0.0 {
            width = snap_within(height as f64 * aspect, max_width, modulus);
        }
    }

    (width, height)
}

fn snap(value: f64, modulus: u32) -> u32 {
    let m = modulus as f64;
    let snapped = (value / m).round() * m;
    (snapped as u32).max(modulus)
}

/// Rounds to the nearest multiple of `modulus`, or down when that passes `max`.
fn snap_within(value: f64, max: u32, modulus: u32) -> u32 {
    let snapped = snap(value, modulus);
    if snapped > max {
        snap_down(max, modulus)
    } else {
        snapped
    }
}

fn snap_down(value: u32, modulus: u32) -> u32 {
    (value / modulus * modulus).max(modulus)
}
